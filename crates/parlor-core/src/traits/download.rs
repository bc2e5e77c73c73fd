// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Download manager capability.

use crate::error::ParlorError;
use crate::types::{DownloadProgress, DownloadRequest, DownloadRequestId};

/// An out-of-process style download manager.
///
/// `enqueue` returns immediately with a request id. The implementation later
/// emits exactly one completion for that id through whatever channel it was
/// wired with, or none at all if the process goes away first.
pub trait DownloadService: Send + Sync + 'static {
    /// Accepts a fetch request and returns its id.
    fn enqueue(&self, request: DownloadRequest) -> Result<DownloadRequestId, ParlorError>;

    /// Polls the current status of a request.
    fn query(&self, request_id: DownloadRequestId) -> DownloadProgress;
}
