// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup wiring shared by every subcommand.

use std::sync::Arc;

use parlor_chat::{ConversationStore, GenerationPipeline};
use parlor_config::ParlorConfig;
use parlor_core::{EngineSlot, ParlorError};
use parlor_model::{HttpDownloader, ModelLifecycleManager, ModelPaths, completion_channel};
use parlor_storage::{Preferences, SqliteKeyValueStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::CommandEngineLoader;

/// The running core: storage, conversations, model lifecycle, pipeline.
pub struct App {
    pub config: ParlorConfig,
    pub preferences: Preferences,
    pub store: Arc<ConversationStore>,
    pub pipeline: GenerationPipeline,
    pub manager: Arc<ModelLifecycleManager>,
    shutdown: CancellationToken,
    listener: JoinHandle<()>,
}

impl App {
    pub async fn start(config: ParlorConfig) -> Result<Self, ParlorError> {
        let kv = SqliteKeyValueStore::open(&config.storage).await?;
        let preferences = Preferences::new(Arc::new(kv));

        let engine_slot = Arc::new(EngineSlot::new());
        let (completions, receiver) = completion_channel();
        let manager = Arc::new(ModelLifecycleManager::new(
            preferences.clone(),
            Arc::new(CommandEngineLoader::new(config.engine.clone())),
            Arc::new(HttpDownloader::new(completions)),
            Arc::clone(&engine_slot),
            ModelPaths::from_config(&config.model),
        ));
        manager.restore().await?;

        let shutdown = CancellationToken::new();
        let listener = manager.spawn_completion_listener(receiver, shutdown.clone());

        let store = Arc::new(ConversationStore::load(preferences.clone()).await?);
        let pipeline = GenerationPipeline::new(Arc::clone(&store), engine_slot);

        info!(
            database = %config.storage.database_path,
            model_dir = %config.model.model_dir,
            "parlor started"
        );
        Ok(Self {
            config,
            preferences,
            store,
            pipeline,
            manager,
            shutdown,
            listener,
        })
    }

    /// Stops the completion listener. Downloads still running are abandoned.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let _ = self.listener.await;
        info!("parlor stopped");
    }
}
