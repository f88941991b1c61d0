//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{EdgeConfig, Stage};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the process configuration: the file at `path` (or defaults),
/// then the stage override, then validation of the result. Stage-derived
/// URLs are checked whether or not a file was given.
pub fn resolve_config(path: Option<&Path>, stage: Option<Stage>) -> Result<EdgeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => EdgeConfig::default(),
    };
    if let Some(stage) = stage {
        config.stage = stage;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
