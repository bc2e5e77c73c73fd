// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Parlor.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently ignored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Parlor configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParlorConfig {
    /// Application identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Key-value store location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Model files, default download, and import cache.
    #[serde(default)]
    pub model: ModelConfig,

    /// Local inference command.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Application identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name shown in the shell banner.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "parlor".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite file backing the key-value store.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("parlor"))
        .unwrap_or_else(|| PathBuf::from(".parlor"))
}

fn default_database_path() -> String {
    data_dir().join("parlor.db").to_string_lossy().to_string()
}

/// Model file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Private directory holding the default model file.
    #[serde(default = "default_model_dir")]
    pub model_dir: String,

    /// Well-known filename of the default model inside `model_dir`.
    #[serde(default = "default_model_file")]
    pub default_model_file: String,

    /// Source URL the default model is fetched from.
    #[serde(default = "default_model_url")]
    pub default_model_url: String,

    /// Directory custom model files are copied into on import.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            default_model_file: default_model_file(),
            default_model_url: default_model_url(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl ModelConfig {
    /// Full path of the default model file.
    pub fn default_model_path(&self) -> PathBuf {
        PathBuf::from(&self.model_dir).join(&self.default_model_file)
    }
}

fn default_model_dir() -> String {
    data_dir().join("models").to_string_lossy().to_string()
}

fn default_model_file() -> String {
    "qwen2.5-0.5b-instruct-q4_k_m.gguf".to_string()
}

fn default_model_url() -> String {
    "https://huggingface.co/Qwen/Qwen2.5-0.5B-Instruct-GGUF/resolve/main/qwen2.5-0.5b-instruct-q4_k_m.gguf"
        .to_string()
}

fn default_cache_dir() -> String {
    dirs::cache_dir()
        .map(|p| p.join("parlor"))
        .unwrap_or_else(|| PathBuf::from(".parlor/cache"))
        .to_string_lossy()
        .to_string()
}

/// Local inference command configuration.
///
/// The engine is invoked as `{command} {args..} -m {model} -p {prompt} -n {max_tokens}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Executable to run (llama.cpp's `llama-cli` or compatible).
    #[serde(default = "default_engine_command")]
    pub command: String,

    /// Extra arguments placed before the model/prompt arguments.
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,

    /// Maximum number of tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: default_engine_args(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_engine_command() -> String {
    "llama-cli".to_string()
}

fn default_engine_args() -> Vec<String> {
    vec![
        "--no-display-prompt".to_string(),
        "--simple-io".to_string(),
        "-no-cnv".to_string(),
    ]
}

fn default_max_tokens() -> u32 {
    512
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_path_joins_dir_and_file() {
        let config = ModelConfig {
            model_dir: "/data/models".into(),
            default_model_file: "tiny.gguf".into(),
            ..ModelConfig::default()
        };
        assert_eq!(
            config.default_model_path(),
            PathBuf::from("/data/models/tiny.gguf")
        );
    }

    #[test]
    fn engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.command, "llama-cli");
        assert_eq!(engine.max_tokens, 512);
        assert!(engine.args.contains(&"--no-display-prompt".to_string()));
    }

    #[test]
    fn unknown_engine_key_rejected() {
        let result = toml::from_str::<ParlorConfig>("[engine]\ncomand = \"x\"\n");
        assert!(result.is_err());
    }
}
