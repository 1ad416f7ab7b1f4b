// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating an inversion configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML/TOML or does not match the schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A value parsed but violates a constraint.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },

    /// A flat key/value entry could not be placed in the configuration tree.
    #[error("Invalid configuration key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Every constraint violation found in one validation pass.
    #[error("Configuration validation failed: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ConfigError>),
}

impl ConfigError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
