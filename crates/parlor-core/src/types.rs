// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across Parlor crates.
//!
//! Conversations serialize with the camelCase field names of the persisted
//! `conversations_json` array, so records written before message timestamps
//! existed still load.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier of a conversation within the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub u64);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,
    pub is_from_user: bool,
    /// Absent on records persisted before timestamps were tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// A message typed by the user, stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: true,
            created_at: Some(Utc::now()),
        }
    }

    /// A reply produced on the model side (including sentinel and error replies).
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: false,
            created_at: Some(Utc::now()),
        }
    }
}

/// A named, ordered thread of messages.
///
/// Values are never edited in place by the store: [`Conversation::with_message`]
/// and [`Conversation::renamed`] build the replacement value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// A fresh, empty conversation named `Chat {id}`.
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            name: format!("Chat {id}"),
            messages: Vec::new(),
        }
    }

    /// Returns a copy with `message` appended after the existing messages.
    pub fn with_message(&self, message: Message) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend(self.messages.iter().cloned());
        messages.push(message);
        Self {
            id: self.id,
            name: self.name.clone(),
            messages,
        }
    }

    /// Returns a copy carrying a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            id: self.id,
            name: name.into(),
            messages: self.messages.clone(),
        }
    }
}

/// Outcome of an operation addressed by conversation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The id existed and the operation was applied.
    Found,
    /// No conversation with that id; nothing changed.
    NotFound,
}

impl Lookup {
    pub fn is_found(self) -> bool {
        matches!(self, Lookup::Found)
    }
}

/// Opaque token correlating an outstanding download with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadRequestId(pub u64);

impl std::fmt::Display for DownloadRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dl-{}", self.0)
    }
}

/// A fetch request handed to the download capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
}

/// Terminal status carried by a completion event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Succeeded,
    Failed { reason: String },
}

/// The single completion event emitted for a download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCompletion {
    pub request_id: DownloadRequestId,
    pub outcome: DownloadOutcome,
}

impl DownloadCompletion {
    pub fn succeeded(request_id: DownloadRequestId) -> Self {
        Self {
            request_id,
            outcome: DownloadOutcome::Succeeded,
        }
    }

    pub fn failed(request_id: DownloadRequestId, reason: impl Into<String>) -> Self {
        Self {
            request_id,
            outcome: DownloadOutcome::Failed {
                reason: reason.into(),
            },
        }
    }
}

/// Status of a request as reported by the download capability when polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadProgress {
    Pending,
    Running { downloaded: u64, total: Option<u64> },
    Succeeded,
    Failed { reason: String },
    /// The capability has no record of the request (e.g. after a restart).
    Unknown,
}
