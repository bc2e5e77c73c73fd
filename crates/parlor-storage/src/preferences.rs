// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed access to the persisted preference keys.

use std::sync::Arc;

use parlor_core::{KeyValueStore, ParlorError};
use tracing::warn;

/// Theme flag, stored as `"true"` / `"false"`.
pub const DARK_THEME_KEY: &str = "dark_theme";
/// Active model path; empty or absent means no model configured.
pub const MODEL_PATH_KEY: &str = "model_path";
/// JSON array of every conversation.
pub const CONVERSATIONS_KEY: &str = "conversations_json";

/// Typed wrapper over a [`KeyValueStore`] for the keys Parlor persists.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn dark_theme(&self) -> Result<bool, ParlorError> {
        match self.store.get(DARK_THEME_KEY).await?.as_deref() {
            None => Ok(false),
            Some(raw) => Ok(raw.parse().unwrap_or_else(|_| {
                warn!(value = raw, "unreadable dark_theme preference, using light theme");
                false
            })),
        }
    }

    pub async fn set_dark_theme(&self, dark: bool) -> Result<(), ParlorError> {
        self.store.set(DARK_THEME_KEY, &dark.to_string()).await
    }

    /// The configured model path, empty when none is set.
    pub async fn model_path(&self) -> Result<String, ParlorError> {
        Ok(self.store.get(MODEL_PATH_KEY).await?.unwrap_or_default())
    }

    pub async fn set_model_path(&self, path: &str) -> Result<(), ParlorError> {
        self.store.set(MODEL_PATH_KEY, path).await
    }

    /// Raw persisted conversation list, if one was ever written.
    pub async fn conversations_json(&self) -> Result<Option<String>, ParlorError> {
        self.store.get(CONVERSATIONS_KEY).await
    }

    pub async fn set_conversations_json(&self, json: &str) -> Result<(), ParlorError> {
        self.store.set(CONVERSATIONS_KEY, json).await
    }
}
