//! Profile-driven adapter factory.
//!
//! Reads `profiles.yml`, picks the configured target and binds the matching
//! warehouse client. Profile and connectivity problems are fatal; cosmetic
//! issues come back as warnings.

use std::sync::Arc;

use metricgate_core::engine::{AdapterBinding, AdapterFactory, ProfileLocation};
use metricgate_core::error::AdapterError;

use crate::profiles;
use crate::sqlite::{self, SqliteClient};

#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileAdapterFactory;

impl ProfileAdapterFactory {
    pub fn new() -> Self {
        Self
    }
}

impl AdapterFactory for ProfileAdapterFactory {
    fn connect(&self, location: &ProfileLocation) -> Result<AdapterBinding, AdapterError> {
        let resolved = profiles::load_target(location)?;
        let output = &resolved.output;

        match output.adapter_type.as_str() {
            sqlite::ADAPTER_TYPE => {
                let path = output.database_path().ok_or_else(|| {
                    AdapterError::Profile(format!(
                        "target `{}`: sqlite needs `path` or `schemas_and_paths.main`",
                        resolved.target_name
                    ))
                })?;
                let client = SqliteClient::connect(path).map_err(|e| AdapterError::Connection(sqlite::cause(&e)))?;
                tracing::info!(
                    target_name = %resolved.target_name,
                    path = %client.path().display(),
                    "sqlite adapter connected"
                );
                Ok(AdapterBinding {
                    client: Arc::new(client),
                    warnings: resolved.warnings,
                })
            }
            other => Err(AdapterError::Unsupported(other.to_string())),
        }
    }
}
