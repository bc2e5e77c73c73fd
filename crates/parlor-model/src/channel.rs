// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff of download completions from the download capability to the
//! lifecycle manager.
//!
//! Any number of producers, one consumer. Producers never block or await,
//! so a completion can be pushed from a sync callback. Delivery is
//! at-most-once: anything still buffered when the process exits is lost.

use parlor_core::DownloadCompletion;
use tokio::sync::mpsc;
use tracing::warn;

/// Creates a connected sender/receiver pair.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, CompletionReceiver { rx })
}

/// Producer half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<DownloadCompletion>,
}

impl CompletionSender {
    /// Pushes a completion. Returns false if the receiver is gone.
    pub fn notify(&self, completion: DownloadCompletion) -> bool {
        match self.tx.send(completion) {
            Ok(()) => true,
            Err(mpsc::error::SendError(dropped)) => {
                warn!(
                    request_id = %dropped.request_id,
                    "download completion dropped, no listener"
                );
                false
            }
        }
    }
}

/// Consumer half, owned by the single listener task.
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: mpsc::UnboundedReceiver<DownloadCompletion>,
}

impl CompletionReceiver {
    /// Waits for the next completion. `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<DownloadCompletion> {
        self.rx.recv().await
    }

    /// Takes a buffered completion without waiting.
    pub fn try_recv(&mut self) -> Option<DownloadCompletion> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::DownloadRequestId;

    #[tokio::test]
    async fn completions_arrive_in_push_order() {
        let (tx, mut rx) = completion_channel();
        let other = tx.clone();
        assert!(tx.notify(DownloadCompletion::succeeded(DownloadRequestId(1))));
        assert!(other.notify(DownloadCompletion::failed(DownloadRequestId(2), "disk full")));

        assert_eq!(
            rx.recv().await,
            Some(DownloadCompletion::succeeded(DownloadRequestId(1)))
        );
        assert_eq!(
            rx.recv().await,
            Some(DownloadCompletion::failed(DownloadRequestId(2), "disk full"))
        );
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn notify_without_runtime_or_listener() {
        let (tx, rx) = completion_channel();
        drop(rx);
        assert!(!tx.notify(DownloadCompletion::succeeded(DownloadRequestId(5))));
    }

    #[tokio::test]
    async fn recv_ends_when_senders_drop() {
        let (tx, mut rx) = completion_channel();
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}
