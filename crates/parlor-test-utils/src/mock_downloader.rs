// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock download capability. Records requests and reports whatever
//! progress the test sets; completions are delivered by the test itself.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parlor_core::{DownloadProgress, DownloadRequest, DownloadRequestId, DownloadService, ParlorError};

#[derive(Default)]
pub struct MockDownloader {
    requests: Mutex<Vec<(DownloadRequestId, DownloadRequest)>>,
    progress: Mutex<HashMap<DownloadRequestId, DownloadProgress>>,
    next_id: AtomicU64,
    fail_enqueue: AtomicBool,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests accepted so far, in order.
    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// Id of the most recently accepted request.
    pub fn last_request_id(&self) -> Option<DownloadRequestId> {
        self.requests.lock().unwrap().last().map(|(id, _)| *id)
    }

    pub fn set_progress(&self, id: DownloadRequestId, progress: DownloadProgress) {
        self.progress.lock().unwrap().insert(id, progress);
    }

    /// Makes `enqueue` reject requests.
    pub fn fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }
}

impl DownloadService for MockDownloader {
    fn enqueue(&self, request: DownloadRequest) -> Result<DownloadRequestId, ParlorError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(ParlorError::download("download manager unavailable"));
        }
        let id = DownloadRequestId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.requests.lock().unwrap().push((id, request));
        self.set_progress(id, DownloadProgress::Pending);
        Ok(id)
    }

    fn query(&self, request_id: DownloadRequestId) -> DownloadProgress {
        self.progress
            .lock()
            .unwrap()
            .get(&request_id)
            .cloned()
            .unwrap_or(DownloadProgress::Unknown)
    }
}
