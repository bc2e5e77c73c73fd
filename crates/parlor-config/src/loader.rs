// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./parlor.toml` > `~/.config/parlor/parlor.toml` > `/etc/parlor/parlor.toml`,
//! with environment variable overrides via the `PARLOR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ParlorConfig;

/// Config sections, used to map `PARLOR_SECTION_KEY` onto `section.key`.
const SECTIONS: &[&str] = &["app", "storage", "model", "engine"];

/// Location of the system-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/parlor/parlor.toml";

/// Name of the config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "parlor.toml";

/// Location of the per-user config file, if a config dir is known.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("parlor").join("parlor.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parlor/parlor.toml`
/// 3. `~/.config/parlor/parlor.toml`
/// 4. `./parlor.toml`
/// 5. `PARLOR_*` environment variables
pub fn load_config() -> Result<ParlorConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ParlorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParlorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The layered Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ParlorConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `PARLOR_MODEL_CACHE_DIR` to `model.cache_dir`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that themselves contain underscores stay intact.
fn env_provider() -> Env {
    Env::prefixed("PARLOR_").map(|key| section_key(key.as_str()).into())
}

fn section_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_key_maps_first_underscore_only() {
        assert_eq!(section_key("model_default_model_url"), "model.default_model_url");
        assert_eq!(section_key("storage_database_path"), "storage.database_path");
        assert_eq!(section_key("engine_max_tokens"), "engine.max_tokens");
        assert_eq!(section_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_override_applies() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PARLOR_APP_LOG_LEVEL", "debug");
            jail.set_env("PARLOR_ENGINE_MAX_TOKENS", "64");
            let config = load_config_from_path(Path::new("missing.toml"))?;
            assert_eq!(config.app.log_level, "debug");
            assert_eq!(config.engine.max_tokens, 64);
            Ok(())
        });
    }

    #[test]
    fn local_file_is_picked_up() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_CONFIG_FILE,
                "[model]\ndefault_model_file = \"local.gguf\"\n",
            )?;
            let config = load_config()?;
            assert_eq!(config.model.default_model_file, "local.gguf");
            Ok(())
        });
    }
}
