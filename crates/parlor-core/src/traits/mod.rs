// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits for the collaborators the chat core depends on but
//! does not implement itself.

pub mod content;
pub mod download;
pub mod engine;
pub mod kv;

pub use content::{ContentSource, FileSource};
pub use download::DownloadService;
pub use engine::{EngineLoader, InferenceEngine};
pub use kv::KeyValueStore;
