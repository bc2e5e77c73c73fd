// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model lifecycle management for Parlor.
//!
//! - [`ModelLifecycleManager`] owns the configured model path, the
//!   default-model download state machine, and the engine slot reloads.
//! - [`completion_channel`] carries download completions to the manager's
//!   listener task.
//! - [`HttpDownloader`] is the reqwest-backed download capability.

pub mod channel;
pub mod downloader;
pub mod import;
pub mod manager;

pub use channel::{CompletionReceiver, CompletionSender, completion_channel};
pub use downloader::HttpDownloader;
pub use manager::{DefaultModelState, ModelLifecycleManager, ModelPaths, ModelStatus};
