// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONCURRENCY_VAR: &str = "BLUEPRINT_CONCURRENCY";
pub const STEP_TIMEOUT_VAR: &str = "BLUEPRINT_STEP_TIMEOUT_MS";

/// `max(1, cpus - 1)`: leave one core for the runtime's own bookkeeping.
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    /// Worker pool size for the bounded fan-out phases.
    pub concurrency: Option<usize>,

    /// Limit applied to every step, provider call and rule evaluation.
    #[serde(rename = "stepTimeoutMs", with = "millis")]
    pub step_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            step_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Effective pool size. Zero is clamped to one.
    pub fn workers(&self) -> usize {
        self.concurrency.unwrap_or_else(default_workers).max(1)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Defaults overridden by `BLUEPRINT_CONCURRENCY` and
    /// `BLUEPRINT_STEP_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup(CONCURRENCY_VAR) {
            let n = v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("{CONCURRENCY_VAR}=`{v}` is not a count"))?;
            config.concurrency = Some(n);
        }
        if let Some(v) = lookup(STEP_TIMEOUT_VAR) {
            let ms = v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{STEP_TIMEOUT_VAR}=`{v}` is not a duration"))?;
            config.step_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Snapshot of environment variables used for `${NAME}` interpolation and by
/// the `env` provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|s| s.as_str())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Replace each `${NAME}` in `s`. `$$` is a literal `$`.
    ///
    /// Fails with the name of the first variable that is not set.
    pub fn interpolate(&self, s: &str) -> Result<String, String> {
        let mut out = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            if let Some(after) = tail.strip_prefix('$') {
                out.push('$');
                rest = after;
            } else if let Some(body) = tail.strip_prefix('{') {
                match body.find('}') {
                    Some(end) => {
                        let name = &body[..end];
                        match self.get(name) {
                            Some(v) => out.push_str(v),
                            None => return Err(name.to_string()),
                        }
                        rest = &body[end + 1..];
                    }
                    None => {
                        // Unterminated. Keep the text as is.
                        out.push('$');
                        rest = tail;
                    }
                }
            } else {
                out.push('$');
                rest = tail;
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
