// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::ParlorConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &ParlorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.app.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "app.log_level `{}` is not one of {}",
                config.app.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.model.model_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "model.model_dir must not be empty".to_string(),
        });
    }

    if config.model.cache_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "model.cache_dir must not be empty".to_string(),
        });
    }

    let file = config.model.default_model_file.trim();
    if file.is_empty() {
        errors.push(ConfigError::Validation {
            message: "model.default_model_file must not be empty".to_string(),
        });
    } else if file.contains('/') || file.contains('\\') {
        errors.push(ConfigError::Validation {
            message: format!("model.default_model_file `{file}` must be a bare file name"),
        });
    }

    let url = config.model.default_model_url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        errors.push(ConfigError::Validation {
            message: format!("model.default_model_url `{url}` must be an http(s) URL"),
        });
    }

    if config.engine.command.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "engine.command must not be empty".to_string(),
        });
    }

    if config.engine.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.max_tokens must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
