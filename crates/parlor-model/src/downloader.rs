// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP implementation of the download capability.
//!
//! Each request streams into `{destination}.part` and is renamed into place
//! once the body is complete. Exactly one completion is pushed per request,
//! after the rename (or after cleanup on failure).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::StreamExt;
use parlor_core::{
    DownloadCompletion, DownloadProgress, DownloadRequest, DownloadRequestId, DownloadService,
    ParlorError,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::channel::CompletionSender;

/// Streams downloads with reqwest on the ambient tokio runtime.
pub struct HttpDownloader {
    client: reqwest::Client,
    completions: CompletionSender,
    progress: Arc<DashMap<DownloadRequestId, DownloadProgress>>,
    next_id: AtomicU64,
}

impl HttpDownloader {
    pub fn new(completions: CompletionSender) -> Self {
        Self::with_client(reqwest::Client::new(), completions)
    }

    pub fn with_client(client: reqwest::Client, completions: CompletionSender) -> Self {
        Self {
            client,
            completions,
            progress: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl DownloadService for HttpDownloader {
    fn enqueue(&self, request: DownloadRequest) -> Result<DownloadRequestId, ParlorError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| ParlorError::Download {
            message: "downloads need a running tokio runtime".into(),
            source: Some(Box::new(e)),
        })?;

        let id = DownloadRequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.progress.insert(id, DownloadProgress::Pending);

        let client = self.client.clone();
        let progress = Arc::clone(&self.progress);
        let completions = self.completions.clone();
        runtime.spawn(async move {
            info!(request_id = %id, url = %request.url, "download started");
            let completion = match fetch(&client, &request, id, &progress).await {
                Ok(bytes) => {
                    info!(request_id = %id, bytes, path = %request.destination.display(), "download finished");
                    progress.insert(id, DownloadProgress::Succeeded);
                    DownloadCompletion::succeeded(id)
                }
                Err(e) => {
                    let reason = e.to_string();
                    warn!(request_id = %id, error = %reason, "download failed");
                    progress.insert(
                        id,
                        DownloadProgress::Failed {
                            reason: reason.clone(),
                        },
                    );
                    DownloadCompletion::failed(id, reason)
                }
            };
            // A delivered completion carries the outcome; keep the entry only
            // when nobody is listening so a poll can still see it.
            if completions.notify(completion) {
                progress.remove(&id);
            }
        });

        Ok(id)
    }

    /// A finished request is reported once and then forgotten.
    fn query(&self, request_id: DownloadRequestId) -> DownloadProgress {
        if let Some((_, finished)) = self.progress.remove_if(&request_id, |_, p| is_finished(p)) {
            return finished;
        }
        self.progress
            .get(&request_id)
            .map(|entry| entry.value().clone())
            .unwrap_or(DownloadProgress::Unknown)
    }
}

fn is_finished(progress: &DownloadProgress) -> bool {
    matches!(
        progress,
        DownloadProgress::Succeeded | DownloadProgress::Failed { .. }
    )
}

async fn fetch(
    client: &reqwest::Client,
    request: &DownloadRequest,
    id: DownloadRequestId,
    progress: &DashMap<DownloadRequestId, DownloadProgress>,
) -> Result<u64, ParlorError> {
    if let Some(parent) = request.destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client
        .get(&request.url)
        .send()
        .await
        .map_err(|e| ParlorError::Download {
            message: format!("request to {} failed", request.url),
            source: Some(Box::new(e)),
        })?;
    if !response.status().is_success() {
        return Err(ParlorError::download(format!(
            "server answered {} for {}",
            response.status(),
            request.url
        )));
    }

    let part = part_path(&request.destination);
    let total = response.content_length();
    let written = match stream_to_file(response, &part, id, total, progress).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&part, &request.destination).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e.into());
    }
    Ok(written)
}

async fn stream_to_file(
    response: reqwest::Response,
    part: &Path,
    id: DownloadRequestId,
    total: Option<u64>,
    progress: &DashMap<DownloadRequestId, DownloadProgress>,
) -> Result<u64, ParlorError> {
    let mut file = tokio::fs::File::create(part).await?;
    let mut body = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ParlorError::Download {
            message: "connection interrupted".into(),
            source: Some(Box::new(e)),
        })?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        progress.insert(id, DownloadProgress::Running { downloaded, total });
    }

    file.flush().await?;
    file.sync_all().await?;
    debug!(request_id = %id, downloaded, "download body written");
    Ok(downloaded)
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
