// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{config_str, ConfigureRequest, ProvideRequest, ProvideResponse, Provider};
use crate::error::ProviderError;
use crate::typing::Type;
use crate::value::Value;

use std::path::PathBuf;

use async_trait::async_trait;

/// Serves the contents of a JSON or YAML file.
#[derive(Debug, Default)]
pub struct FileProvider {
    path: Option<PathBuf>,
}

#[async_trait]
impl Provider for FileProvider {
    fn config_schema(&self) -> Type {
        Type::object([("path", Type::String)])
    }

    async fn configure(&mut self, request: ConfigureRequest) -> Result<(), ProviderError> {
        match config_str(&request.config, "path") {
            Some(path) => {
                self.path = Some(PathBuf::from(path));
                Ok(())
            }
            None => Err(ProviderError::Configure {
                source_alias: request.source_alias,
                message: "missing `path`".to_string(),
            }),
        }
    }

    async fn provide(&self, request: ProvideRequest) -> ProvideResponse {
        let Some(path) = self.path.clone() else {
            return ProvideResponse::error(
                format!("source `{}` is not configured", request.source_alias),
                "",
            );
        };

        let read = tokio::task::spawn_blocking(move || Value::from_file(&path)).await;
        match read {
            Ok(Ok(value)) => ProvideResponse::value(value),
            Ok(Err(e)) => ProvideResponse::error(
                format!("source `{}` could not be read", request.source_alias),
                e.to_string(),
            ),
            Err(e) => ProvideResponse::error(
                format!("source `{}` could not be read", request.source_alias),
                e.to_string(),
            ),
        }
    }
}
