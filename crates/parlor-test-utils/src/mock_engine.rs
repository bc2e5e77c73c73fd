// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock inference engine and loader for deterministic testing.
//!
//! `MockEngine` pops replies from a FIFO queue (falling back to
//! "mock response"), records every prompt, and can be held at a gate so
//! tests can observe a generation while it is in flight.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

use parlor_core::{EngineLoader, InferenceEngine, ParlorError};

#[derive(Default)]
struct Gate {
    held: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn set(&self, held: bool) {
        *self.held.lock().unwrap() = held;
        self.opened.notify_all();
    }

    fn wait(&self) {
        let mut held = self.held.lock().unwrap();
        while *held {
            held = self.opened.wait(held).unwrap();
        }
    }
}

/// Keeps generations blocked until released or dropped.
pub struct EngineGate {
    gate: Arc<Gate>,
}

impl EngineGate {
    pub fn release(&self) {
        self.gate.set(false);
    }
}

impl Drop for EngineGate {
    fn drop(&mut self) {
        self.gate.set(false);
    }
}

enum Behavior {
    Reply,
    Fail(String),
    Panic,
}

/// A scripted [`InferenceEngine`].
pub struct MockEngine {
    responses: Mutex<VecDeque<String>>,
    behavior: Behavior,
    prompts: Mutex<Vec<String>>,
    gate: Arc<Gate>,
}

impl MockEngine {
    fn build(responses: Vec<String>, behavior: Behavior) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            behavior,
            prompts: Mutex::new(Vec::new()),
            gate: Arc::new(Gate::default()),
        }
    }

    pub fn new() -> Self {
        Self::build(Vec::new(), Behavior::Reply)
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::build(responses, Behavior::Reply)
    }

    /// Every call fails with an engine error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::build(Vec::new(), Behavior::Fail(message.into()))
    }

    /// Every call panics.
    pub fn panicking() -> Self {
        Self::build(Vec::new(), Behavior::Panic)
    }

    pub fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(text.into());
    }

    /// Blocks generations until the returned gate is released or dropped.
    pub fn hold(&self) -> EngineGate {
        self.gate.set(true);
        EngineGate {
            gate: Arc::clone(&self.gate),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine for MockEngine {
    fn generate(&self, prompt: &str) -> Result<String, ParlorError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.gate.wait();
        match &self.behavior {
            Behavior::Reply => Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "mock response".to_string())),
            Behavior::Fail(message) => Err(ParlorError::engine(message.clone())),
            Behavior::Panic => panic!("mock engine panicked on {prompt:?}"),
        }
    }
}

/// A scripted [`EngineLoader`] that hands out one shared [`MockEngine`].
pub struct MockEngineLoader {
    engine: Arc<MockEngine>,
    failure: Option<String>,
    loads: Mutex<Vec<PathBuf>>,
}

impl MockEngineLoader {
    pub fn new() -> Self {
        Self::with_engine(Arc::new(MockEngine::new()))
    }

    pub fn with_engine(engine: Arc<MockEngine>) -> Self {
        Self {
            engine,
            failure: None,
            loads: Mutex::new(Vec::new()),
        }
    }

    /// Every load fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    pub fn engine(&self) -> Arc<MockEngine> {
        Arc::clone(&self.engine)
    }

    /// Paths passed to `load`, in call order (failed loads included).
    pub fn loads(&self) -> Vec<PathBuf> {
        self.loads.lock().unwrap().clone()
    }
}

impl Default for MockEngineLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLoader for MockEngineLoader {
    fn load(&self, model_path: &Path) -> Result<Arc<dyn InferenceEngine>, ParlorError> {
        self.loads.lock().unwrap().push(model_path.to_path_buf());
        if let Some(message) = &self.failure {
            return Err(ParlorError::engine(message.clone()));
        }
        Ok(self.engine.clone())
    }
}
