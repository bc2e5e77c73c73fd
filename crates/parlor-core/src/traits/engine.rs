// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference engine capability.

use std::path::Path;
use std::sync::Arc;

use crate::error::ParlorError;

/// A loaded, ready-to-use text-generation engine.
///
/// `generate` is synchronous and may block for seconds; callers run it on
/// the blocking pool, never on the async executor.
pub trait InferenceEngine: Send + Sync + 'static {
    /// Produces a complete reply for `prompt`.
    fn generate(&self, prompt: &str) -> Result<String, ParlorError>;
}

/// Builds an [`InferenceEngine`] bound to a model file.
///
/// Construction can be slow (weights are mapped or parsed here) and is
/// also run on the blocking pool.
pub trait EngineLoader: Send + Sync + 'static {
    fn load(&self, model_path: &Path) -> Result<Arc<dyn InferenceEngine>, ParlorError>;
}
