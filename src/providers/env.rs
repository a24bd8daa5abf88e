// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{config_str, ConfigureRequest, ProvideRequest, ProvideResponse, Provider};
use crate::error::ProviderError;
use crate::typing::Type;
use crate::value::Value;

use std::collections::BTreeMap;

use async_trait::async_trait;

/// Serves environment variables as an object of strings.
///
/// `prefix` keeps only the variables starting with it; `stripPrefix` removes
/// the prefix from the keys.
#[derive(Debug, Default)]
pub struct EnvProvider {
    vars: BTreeMap<String, Value>,
}

#[async_trait]
impl Provider for EnvProvider {
    fn config_schema(&self) -> Type {
        Type::object([
            ("prefix", Type::optional(Type::String)),
            ("stripPrefix", Type::optional(Type::Bool)),
        ])
    }

    async fn configure(&mut self, request: ConfigureRequest) -> Result<(), ProviderError> {
        let prefix = config_str(&request.config, "prefix").unwrap_or_default();
        let strip = match request.config.get_attr("stripPrefix") {
            None => false,
            Some(v) if v.is_null() => false,
            Some(v) => v.as_bool().map_err(|e| ProviderError::Configure {
                source_alias: request.source_alias.clone(),
                message: format!("stripPrefix: {e}"),
            })?,
        };

        self.vars = request
            .environment
            .vars()
            .iter()
            .filter_map(|(name, value)| {
                let rest = name.strip_prefix(prefix)?;
                let key = if strip { rest } else { name.as_str() };
                (!key.is_empty()).then(|| (key.to_string(), Value::from(value.as_str())))
            })
            .collect();
        Ok(())
    }

    async fn provide(&self, _request: ProvideRequest) -> ProvideResponse {
        ProvideResponse::value(Value::from(self.vars.clone()))
    }
}
