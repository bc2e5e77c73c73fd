// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` wires the real conversation store, generation pipeline and
//! model lifecycle manager over a temp SQLite database, with the engine and
//! download capabilities replaced by mocks. The completion listener runs
//! for the lifetime of the harness.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parlor_chat::{ConversationStore, GenerationPipeline, GenerationReport, SendOutcome};
use parlor_core::{Conversation, DownloadCompletion, EngineSlot, ParlorError};
use parlor_model::{
    CompletionSender, DefaultModelState, ModelLifecycleManager, ModelPaths, completion_channel,
};
use parlor_storage::{Database, Preferences, SqliteKeyValueStore};
use tokio_util::sync::CancellationToken;

use crate::mock_downloader::MockDownloader;
use crate::mock_engine::{MockEngine, MockEngineLoader};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    conversations: Option<Vec<Conversation>>,
    with_model: bool,
    loader_failure: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            conversations: None,
            with_model: false,
            loader_failure: None,
        }
    }

    /// Set mock engine replies.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Start from this conversation list instead of what storage holds.
    pub fn with_conversations(mut self, conversations: Vec<Conversation>) -> Self {
        self.conversations = Some(conversations);
        self
    }

    /// Write a custom model file and make it the active model.
    pub fn with_model(mut self) -> Self {
        self.with_model = true;
        self
    }

    /// Make every engine load fail.
    pub fn with_failing_loader(mut self, message: impl Into<String>) -> Self {
        self.loader_failure = Some(message.into());
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ParlorError> {
        let temp_dir = tempfile::TempDir::new()?;
        let root = temp_dir.path().to_path_buf();

        let db = Database::open(root.join("parlor.db")).await?;
        let preferences = Preferences::new(Arc::new(SqliteKeyValueStore::new(db)));

        let mock_engine = Arc::new(MockEngine::with_responses(self.responses));
        let loader = Arc::new(match self.loader_failure {
            Some(message) => MockEngineLoader::failing(message),
            None => MockEngineLoader::with_engine(Arc::clone(&mock_engine)),
        });
        let downloads = Arc::new(MockDownloader::new());
        let engine_slot = Arc::new(EngineSlot::new());

        let paths = ModelPaths {
            default_model_path: root.join("models").join("default.gguf"),
            default_model_url: "https://models.invalid/default.gguf".to_string(),
            cache_dir: root.join("cache"),
        };
        let manager = Arc::new(ModelLifecycleManager::new(
            preferences.clone(),
            loader.clone(),
            downloads.clone(),
            Arc::clone(&engine_slot),
            paths,
        ));
        manager.restore().await?;

        let store = Arc::new(match self.conversations {
            Some(list) => ConversationStore::with_conversations(preferences.clone(), list),
            None => ConversationStore::load(preferences.clone()).await?,
        });
        let pipeline = GenerationPipeline::new(Arc::clone(&store), Arc::clone(&engine_slot));

        if self.with_model {
            let model = root.join("custom.gguf");
            tokio::fs::write(&model, b"mock weights").await?;
            manager
                .set_model_path(model.to_string_lossy().into_owned())
                .await?;
        }

        let (completions, receiver) = completion_channel();
        let shutdown = CancellationToken::new();
        manager.spawn_completion_listener(receiver, shutdown.clone());

        Ok(TestHarness {
            store,
            pipeline,
            manager,
            engine_slot,
            mock_engine,
            loader,
            downloads,
            preferences,
            completions,
            shutdown,
            temp_dir,
        })
    }
}

/// A complete test environment with mock capabilities and temp storage.
pub struct TestHarness {
    pub store: Arc<ConversationStore>,
    pub pipeline: GenerationPipeline,
    pub manager: Arc<ModelLifecycleManager>,
    pub engine_slot: Arc<EngineSlot>,
    /// Engine handed out by the loader (unused when loads fail).
    pub mock_engine: Arc<MockEngine>,
    pub loader: Arc<MockEngineLoader>,
    pub downloads: Arc<MockDownloader>,
    pub preferences: Preferences,
    /// Feeds the manager's completion listener.
    pub completions: CompletionSender,
    shutdown: CancellationToken,
    temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Sends `text` to the active conversation and waits for the reply.
    pub async fn send_message(&self, text: &str) -> Result<GenerationReport, ParlorError> {
        let id = self
            .store
            .active_id()
            .await
            .ok_or_else(|| ParlorError::Internal("no active conversation".into()))?;
        match self.pipeline.send_message(id, text).await {
            SendOutcome::Started(handle) => handle.wait().await,
            other => Err(ParlorError::Internal(format!(
                "generation not started: {other:?}"
            ))),
        }
    }

    /// Creates the default model file as a finished download would.
    pub async fn write_default_model(&self) -> Result<PathBuf, ParlorError> {
        let path = self.manager.paths().default_model_path.clone();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, b"default weights").await?;
        Ok(path)
    }

    /// Polls until the default model reaches `want` or `timeout` elapses.
    pub async fn wait_for_default_state(&self, want: DefaultModelState, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.manager.default_model_state().await == want {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Pushes a completion through the channel, as the download manager would.
    pub fn deliver(&self, completion: DownloadCompletion) -> bool {
        self.completions.notify(completion)
    }

    /// Loads a second store from the same database, as a restart would.
    pub async fn reopen_store(&self) -> Result<ConversationStore, ParlorError> {
        ConversationStore::load(self.preferences.clone()).await
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
