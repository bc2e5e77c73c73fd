// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable string key/value store.

use async_trait::async_trait;

use crate::error::ParlorError;

/// Durable string key/value storage.
///
/// Values survive process restarts. Each `set` is durable on its own; there
/// are no transactions spanning several keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, ParlorError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), ParlorError>;
}
