// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{ConfigureRequest, ProvideRequest, ProvideResponse, Provider};
use crate::error::ProviderError;
use crate::typing::Type;
use crate::value::Value;

use async_trait::async_trait;

/// Serves the `value` entry of its configuration.
#[derive(Debug, Default)]
pub struct InlineProvider {
    value: Option<Value>,
}

#[async_trait]
impl Provider for InlineProvider {
    fn config_schema(&self) -> Type {
        Type::object([("value", Type::Generic)])
    }

    async fn configure(&mut self, request: ConfigureRequest) -> Result<(), ProviderError> {
        match request.config.get_attr("value") {
            Some(v) => {
                self.value = Some(v.clone());
                Ok(())
            }
            None => Err(ProviderError::Configure {
                source_alias: request.source_alias,
                message: "missing `value`".to_string(),
            }),
        }
    }

    async fn provide(&self, request: ProvideRequest) -> ProvideResponse {
        match &self.value {
            Some(v) => ProvideResponse::value(v.clone()),
            None => ProvideResponse::error(
                format!("source `{}` is not configured", request.source_alias),
                "",
            ),
        }
    }
}
