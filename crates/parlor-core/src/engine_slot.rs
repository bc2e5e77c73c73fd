// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared "current engine" slot.
//!
//! The model lifecycle manager is the only writer; the generation pipeline
//! takes a snapshot of the slot at send time, so a reload never affects a
//! generation that is already running.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::error::ParlorError;
use crate::traits::InferenceEngine;

/// A loaded engine together with the model file it was built from.
pub struct EngineHandle {
    model_path: PathBuf,
    engine: Arc<dyn InferenceEngine>,
}

impl EngineHandle {
    pub fn new(model_path: impl Into<PathBuf>, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            model_path: model_path.into(),
            engine,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Blocking generation call; see [`InferenceEngine::generate`].
    pub fn generate(&self, prompt: &str) -> Result<String, ParlorError> {
        self.engine.generate(prompt)
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

/// Lock-free holder of the current engine handle, absent when no model is loaded.
pub struct EngineSlot {
    current: ArcSwapOption<EngineHandle>,
}

impl EngineSlot {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    pub fn install(&self, handle: EngineHandle) {
        self.current.store(Some(Arc::new(handle)));
    }

    pub fn clear(&self) {
        self.current.store(None);
    }

    /// Snapshot of the current handle.
    pub fn current(&self) -> Option<Arc<EngineHandle>> {
        self.current.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }
}

impl Default for EngineSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl InferenceEngine for Upper {
        fn generate(&self, prompt: &str) -> Result<String, ParlorError> {
            Ok(prompt.to_uppercase())
        }
    }

    #[test]
    fn slot_starts_empty() {
        let slot = EngineSlot::new();
        assert!(!slot.is_loaded());
        assert!(slot.current().is_none());
    }

    #[test]
    fn snapshot_survives_clear() {
        let slot = EngineSlot::new();
        slot.install(EngineHandle::new("/m/a.gguf", Arc::new(Upper)));
        let snapshot = slot.current().expect("installed");
        slot.clear();
        assert!(!slot.is_loaded());
        assert_eq!(snapshot.generate("hi").unwrap(), "HI");
        assert_eq!(snapshot.model_path(), Path::new("/m/a.gguf"));
    }
}
