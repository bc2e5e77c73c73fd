// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence gateway for Parlor.
//!
//! A WAL-mode SQLite `kv` table behind the [`parlor_core::KeyValueStore`]
//! capability, accessed through a single tokio-rusqlite connection, plus
//! [`Preferences`] for typed access to the keys the app persists.

pub mod database;
pub mod kv;
pub mod migrations;
pub mod preferences;

pub use database::Database;
pub use kv::SqliteKeyValueStore;
pub use preferences::{Preferences, CONVERSATIONS_KEY, DARK_THEME_KEY, MODEL_PATH_KEY};
