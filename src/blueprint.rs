// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Blueprint documents: sources, references and rules.

use crate::value::Value;

use core::fmt;
use std::collections::BTreeMap;
use std::path::{Path as FsPath, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub version: Option<f64>,

    #[serde(default)]
    pub sources: BTreeMap<String, SourceSpec>,

    // Reference alias -> path expression.
    #[serde(default, rename = "$refs")]
    pub refs: BTreeMap<String, String>,

    #[serde(default)]
    pub ruleset: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    pub provider: String,

    #[serde(default)]
    pub config: Option<BTreeMap<String, Value>>,

    #[serde(default)]
    pub config_file: Option<PathBuf>,

    #[serde(default)]
    pub query_options: Option<BTreeMap<String, Value>>,
}

/// Rule argument as written in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(Value),
    /// `{path: "..."}`: resolved through the reference store.
    Path(String),
    /// `{sensitive: <argument>}`: masked wherever the argument is shown.
    Sensitive(Box<Argument>),
}

impl Argument {
    fn from_value(v: Value) -> Argument {
        if let Some(entries) = v.as_entries() {
            if entries.len() == 1 {
                if let Some(Value::String(p)) = entries.get("path") {
                    return Argument::Path(p.as_ref().to_string());
                }
                if let Some(inner) = entries.get("sensitive") {
                    return Argument::Sensitive(Box::new(Argument::from_value(inner.clone())));
                }
            }
        }
        Argument::Literal(v)
    }

    pub fn is_sensitive(&self) -> bool {
        matches!(self, Argument::Sensitive(_))
    }

    /// Path expression of this argument, looking through sensitive wrappers.
    pub fn path(&self) -> Option<&str> {
        match self {
            Argument::Path(p) => Some(p),
            Argument::Sensitive(inner) => inner.path(),
            Argument::Literal(_) => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Argument::Literal(v) => write!(f, "{v}"),
            Argument::Path(p) => write!(f, "{{path: {p}}}"),
            Argument::Sensitive(_) => f.write_str(crate::rules::MASK),
        }
    }
}

/// One entry of the ruleset: `{name?, $value: path, <predicate>: [args...]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub name: Option<String>,
    pub value: String,
    /// Every key other than `name` and `$value`. A valid rule has exactly one.
    pub predicates: Vec<(String, Vec<Argument>)>,
}

impl<'de> Deserialize<'de> for RuleSpec {
    fn deserialize<D>(deserializer: D) -> Result<RuleSpec, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = BTreeMap::<String, Value>::deserialize(deserializer)?;

        let name = match fields.remove("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_ref().to_string()),
            Some(v) => return Err(de::Error::custom(format!("rule name must be a string, got {v}"))),
        };

        let value = match fields.remove("$value") {
            Some(Value::String(s)) => s.as_ref().to_string(),
            Some(v) => {
                return Err(de::Error::custom(format!(
                    "rule `$value` must be a path string, got {v}"
                )))
            }
            None => return Err(de::Error::missing_field("$value")),
        };

        let predicates = fields
            .into_iter()
            .map(|(predicate, args)| {
                let args = match args {
                    Value::Null => vec![],
                    v => match v.as_sequence() {
                        Some(items) => items.iter().cloned().map(Argument::from_value).collect(),
                        None => vec![Argument::from_value(v)],
                    },
                };
                (predicate, args)
            })
            .collect();

        Ok(RuleSpec {
            name,
            value,
            predicates,
        })
    }
}

impl RuleSpec {
    /// Rule name, or its 1-based position when unnamed.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", index + 1),
        }
    }
}

impl Blueprint {
    pub fn from_json_str(json: &str) -> Result<Blueprint> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Blueprint> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file<P: AsRef<FsPath>>(path: P) -> Result<Blueprint> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let blueprint = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            #[cfg(feature = "yaml")]
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => bail!(
                "Unsupported blueprint `{}`. Must be json or yaml.",
                path.display()
            ),
        };
        blueprint.with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// True if `alias` names a source or a reference.
    pub fn has_alias(&self, alias: &str) -> bool {
        self.sources.contains_key(alias) || self.refs.contains_key(alias)
    }
}
