// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model lifecycle: the configured model path, the default-model
//! download/delete state machine, and keeping the engine slot in step with
//! the path.
//!
//! Default model states: `Absent -> Downloading -> Downloaded`, back to
//! `Absent` on delete or on a failed download. Whether the default model
//! file exists on disk is the source of truth; the in-memory flags are
//! reconciled against it whenever they are read.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parlor_config::model::ModelConfig;
use parlor_core::{
    ContentSource, DownloadCompletion, DownloadOutcome, DownloadProgress, DownloadRequest,
    DownloadRequestId, DownloadService, EngineHandle, EngineLoader, EngineSlot, ParlorError,
};
use parlor_storage::Preferences;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::CompletionReceiver;
use crate::import;

/// Filesystem locations and source URL the manager works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub default_model_path: PathBuf,
    pub default_model_url: String,
    pub cache_dir: PathBuf,
}

impl ModelPaths {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            default_model_path: config.default_model_path(),
            default_model_url: config.default_model_url.clone(),
            cache_dir: PathBuf::from(&config.cache_dir),
        }
    }
}

/// Where the default model is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultModelState {
    Absent,
    Downloading(DownloadRequestId),
    Downloaded,
}

/// Snapshot for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStatus {
    /// Configured model path; empty when none is set.
    pub model_path: String,
    /// Whether an engine is currently loaded.
    pub engine_loaded: bool,
    pub default_model: DefaultModelState,
    pub default_model_path: PathBuf,
}

impl ModelStatus {
    pub fn downloading(&self) -> bool {
        matches!(self.default_model, DefaultModelState::Downloading(_))
    }

    pub fn default_model_downloaded(&self) -> bool {
        self.default_model == DefaultModelState::Downloaded
    }
}

#[derive(Default)]
struct LifecycleState {
    model_path: String,
    default_downloaded: bool,
    /// The one download request being tracked.
    outstanding: Option<DownloadRequestId>,
}

impl LifecycleState {
    fn default_model_state(&self) -> DefaultModelState {
        match self.outstanding {
            Some(id) => DefaultModelState::Downloading(id),
            None if self.default_downloaded => DefaultModelState::Downloaded,
            None => DefaultModelState::Absent,
        }
    }
}

/// Owns the model path and the default-model state machine.
///
/// The state lock is held for the whole of each operation, including the
/// engine reload, so reloads are applied in the order paths were set.
pub struct ModelLifecycleManager {
    preferences: Preferences,
    loader: Arc<dyn EngineLoader>,
    downloads: Arc<dyn DownloadService>,
    engine: Arc<EngineSlot>,
    paths: ModelPaths,
    state: Mutex<LifecycleState>,
}

impl ModelLifecycleManager {
    pub fn new(
        preferences: Preferences,
        loader: Arc<dyn EngineLoader>,
        downloads: Arc<dyn DownloadService>,
        engine: Arc<EngineSlot>,
        paths: ModelPaths,
    ) -> Self {
        Self {
            preferences,
            loader,
            downloads,
            engine,
            paths,
            state: Mutex::new(LifecycleState::default()),
        }
    }

    pub fn paths(&self) -> &ModelPaths {
        &self.paths
    }

    /// Reads the persisted model path and loads it. Called once at startup.
    pub async fn restore(&self) -> Result<(), ParlorError> {
        let mut state = self.state.lock().await;
        state.model_path = self.preferences.model_path().await?;
        state.default_downloaded = file_exists(&self.paths.default_model_path).await;
        info!(
            model_path = %state.model_path,
            default_downloaded = state.default_downloaded,
            "model configuration restored"
        );
        self.reload_locked(&state.model_path).await;
        Ok(())
    }

    /// Persists `path` as the active model and reloads the engine.
    ///
    /// The engine is reloaded even when the write fails; the storage error
    /// is returned afterwards.
    pub async fn set_model_path(&self, path: impl Into<String>) -> Result<(), ParlorError> {
        let mut state = self.state.lock().await;
        self.apply_model_path(&mut state, path.into()).await
    }

    /// Rebuilds the engine from the configured path. Returns whether an
    /// engine is loaded afterwards.
    pub async fn reload(&self) -> bool {
        let state = self.state.lock().await;
        self.reload_locked(&state.model_path).await
    }

    /// Requests the default model from its configured URL.
    pub async fn start_default_download(&self) -> Result<DownloadRequestId, ParlorError> {
        let mut state = self.state.lock().await;
        if state.outstanding.is_some() {
            return Err(ParlorError::DownloadInProgress);
        }
        if file_exists(&self.paths.default_model_path).await {
            state.default_downloaded = true;
            return Err(ParlorError::DefaultModelPresent);
        }

        let id = self.downloads.enqueue(DownloadRequest {
            url: self.paths.default_model_url.clone(),
            destination: self.paths.default_model_path.clone(),
        })?;
        state.outstanding = Some(id);
        state.default_downloaded = false;
        info!(request_id = %id, url = %self.paths.default_model_url, "default model download requested");
        Ok(id)
    }

    /// Applies a completion event. Returns false when it was not for the
    /// tracked request and was ignored.
    pub async fn on_download_completed(&self, completion: DownloadCompletion) -> bool {
        let mut state = self.state.lock().await;
        if state.outstanding != Some(completion.request_id) {
            info!(
                request_id = %completion.request_id,
                tracked = ?state.outstanding,
                "ignoring completion for untracked download"
            );
            return false;
        }
        state.outstanding = None;

        match completion.outcome {
            DownloadOutcome::Succeeded => {
                state.default_downloaded = true;
                info!(request_id = %completion.request_id, "default model downloaded");
                let path = self.paths.default_model_path.to_string_lossy().into_owned();
                if let Err(e) = self.apply_model_path(&mut state, path).await {
                    warn!(error = %e, "default model path not persisted");
                }
            }
            DownloadOutcome::Failed { reason } => {
                state.default_downloaded = file_exists(&self.paths.default_model_path).await;
                warn!(request_id = %completion.request_id, %reason, "default model download failed");
            }
        }
        true
    }

    /// Deletes the default model file. Returns whether a file was removed.
    ///
    /// If the default model was the active one, the path is cleared and the
    /// engine unloaded.
    pub async fn delete_default_model(&self) -> bool {
        let mut state = self.state.lock().await;
        let path = self.paths.default_model_path.clone();

        let deleted = match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not delete default model");
                false
            }
        };

        let still_present = file_exists(&path).await;
        state.default_downloaded = still_present;
        if !still_present && Path::new(&state.model_path) == path.as_path() {
            if let Err(e) = self.apply_model_path(&mut state, String::new()).await {
                warn!(error = %e, "cleared model path not persisted");
            }
        }
        if deleted {
            info!(path = %path.display(), "default model deleted");
        }
        deleted
    }

    /// Reconciles the flags with the filesystem and the download capability.
    ///
    /// Covers completions that were never delivered: a finished file ends
    /// tracking and becomes the active model, and a request
    /// the capability reports as failed or no longer knows returns the
    /// state to `Absent`.
    pub async fn refresh_download_status(&self) -> DefaultModelState {
        let mut state = self.state.lock().await;
        let present = file_exists(&self.paths.default_model_path).await;
        state.default_downloaded = present;

        if let Some(id) = state.outstanding {
            if present {
                // Same transition as the success completion, which will be
                // ignored as stale once it arrives.
                info!(request_id = %id, "default model found on disk, download complete");
                state.outstanding = None;
                let path = self.paths.default_model_path.to_string_lossy().into_owned();
                if let Err(e) = self.apply_model_path(&mut state, path).await {
                    warn!(error = %e, "default model path not persisted");
                }
            } else {
                match self.downloads.query(id) {
                    DownloadProgress::Pending | DownloadProgress::Running { .. } => {}
                    DownloadProgress::Failed { reason } => {
                        warn!(request_id = %id, %reason, "download failed without notice");
                        state.outstanding = None;
                    }
                    DownloadProgress::Succeeded | DownloadProgress::Unknown => {
                        warn!(request_id = %id, "download no longer tracked and file missing");
                        state.outstanding = None;
                    }
                }
            }
        }

        state.default_model_state()
    }

    /// Copies a picked model into the cache directory and activates it.
    ///
    /// Returns the new path, or an empty string if the copy failed.
    pub async fn import_custom_model(&self, source: Arc<dyn ContentSource>) -> String {
        let name = source.display_name();
        let cache_dir = self.paths.cache_dir.clone();
        let copied =
            tokio::task::spawn_blocking(move || import::copy_into_cache(source.as_ref(), &cache_dir))
                .await;

        let path = match copied {
            Ok(Ok(path)) => path.to_string_lossy().into_owned(),
            Ok(Err(e)) => {
                warn!(source = %name, error = %e, "custom model import failed");
                return String::new();
            }
            Err(e) => {
                warn!(source = %name, error = %e, "custom model import aborted");
                return String::new();
            }
        };

        info!(source = %name, path = %path, "custom model imported");
        if let Err(e) = self.set_model_path(path.clone()).await {
            warn!(error = %e, "imported model path not persisted");
        }
        path
    }

    pub async fn model_path(&self) -> String {
        self.state.lock().await.model_path.clone()
    }

    pub async fn default_model_state(&self) -> DefaultModelState {
        let mut state = self.state.lock().await;
        state.default_downloaded = file_exists(&self.paths.default_model_path).await;
        state.default_model_state()
    }

    pub async fn status(&self) -> ModelStatus {
        let mut state = self.state.lock().await;
        state.default_downloaded = file_exists(&self.paths.default_model_path).await;
        ModelStatus {
            model_path: state.model_path.clone(),
            engine_loaded: self.engine.is_loaded(),
            default_model: state.default_model_state(),
            default_model_path: self.paths.default_model_path.clone(),
        }
    }

    /// Consumes completions until the channel closes or `shutdown` fires.
    pub async fn run_completions(
        self: Arc<Self>,
        mut completions: CompletionReceiver,
        shutdown: CancellationToken,
    ) {
        debug!("download completion listener started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                next = completions.recv() => match next {
                    Some(completion) => {
                        self.on_download_completed(completion).await;
                    }
                    None => break,
                },
            }
        }
        debug!("download completion listener stopped");
    }

    /// Spawns [`Self::run_completions`] on the current runtime.
    pub fn spawn_completion_listener(
        self: &Arc<Self>,
        completions: CompletionReceiver,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run_completions(completions, shutdown))
    }

    async fn apply_model_path(
        &self,
        state: &mut MutexGuard<'_, LifecycleState>,
        path: String,
    ) -> Result<(), ParlorError> {
        state.model_path = path;
        let persisted = self.preferences.set_model_path(&state.model_path).await;
        self.reload_locked(&state.model_path).await;
        persisted
    }

    async fn reload_locked(&self, path: &str) -> bool {
        if path.is_empty() {
            self.engine.clear();
            info!("no model configured, engine unloaded");
            return false;
        }

        let model_path = PathBuf::from(path);
        let loader = Arc::clone(&self.loader);
        let loaded = tokio::task::spawn_blocking(move || {
            if !model_path.is_file() {
                return Ok(None);
            }
            loader
                .load(&model_path)
                .map(|engine| Some(EngineHandle::new(model_path, engine)))
        })
        .await;

        match loaded {
            Ok(Ok(Some(handle))) => {
                self.engine.install(handle);
                info!(model_path = %path, "engine loaded");
                true
            }
            Ok(Ok(None)) => {
                self.engine.clear();
                warn!(model_path = %path, "model file missing, engine unloaded");
                false
            }
            Ok(Err(e)) => {
                self.engine.clear();
                warn!(model_path = %path, error = %e, "engine failed to load");
                false
            }
            Err(e) => {
                self.engine.clear();
                warn!(model_path = %path, error = %e, "engine load task aborted");
                false
            }
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
