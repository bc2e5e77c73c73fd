// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send-message orchestration.
//!
//! A send appends the user message, then runs the engine on the blocking
//! pool from a spawned task and appends whatever comes back. At most one
//! generation per conversation is outstanding; the in-flight marker is an
//! RAII guard owned by the task, so it is released on every exit path,
//! panics included.

use std::sync::Arc;

use dashmap::DashSet;
use parlor_core::{ConversationId, EngineSlot, Lookup, Message, ParlorError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::ConversationStore;

/// Reply appended when no engine is loaded.
pub const NO_MODEL_REPLY: &str = "No model loaded. Download or select a model first.";

/// Result of [`GenerationPipeline::send_message`].
#[derive(Debug)]
pub enum SendOutcome {
    /// The text was empty or whitespace.
    Ignored,
    /// The conversation already has a generation in flight.
    Busy,
    /// No conversation with that id.
    ConversationNotFound,
    /// The user message was appended and a reply is being produced.
    Started(GenerationHandle),
}

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Generated,
    NoModel,
    EngineFailed,
}

/// What a finished generation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub conversation_id: ConversationId,
    pub reply: String,
    pub kind: ReplyKind,
    /// False when the conversation was deleted before the reply landed.
    pub appended: bool,
}

/// Handle to a running generation. Dropping it does not cancel the work.
#[derive(Debug)]
pub struct GenerationHandle {
    conversation_id: ConversationId,
    task: JoinHandle<GenerationReport>,
}

impl GenerationHandle {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Waits for the reply to be appended.
    pub async fn wait(self) -> Result<GenerationReport, ParlorError> {
        self.task
            .await
            .map_err(|e| ParlorError::Internal(format!("generation task failed: {e}")))
    }
}

/// Removes the conversation from the in-flight set when dropped.
struct InFlightGuard {
    in_flight: Arc<DashSet<ConversationId>>,
    id: ConversationId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

/// Turns user messages into appended model replies.
pub struct GenerationPipeline {
    store: Arc<ConversationStore>,
    engine: Arc<EngineSlot>,
    in_flight: Arc<DashSet<ConversationId>>,
}

impl GenerationPipeline {
    pub fn new(store: Arc<ConversationStore>, engine: Arc<EngineSlot>) -> Self {
        Self {
            store,
            engine,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Sends `text` to conversation `id`.
    ///
    /// Must be called from within a tokio runtime. The engine handle is
    /// captured at call time; a model switch mid-generation does not affect
    /// this reply.
    pub async fn send_message(&self, id: ConversationId, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }
        if !self.in_flight.insert(id) {
            debug!(conversation_id = %id, "generation already in flight");
            return SendOutcome::Busy;
        }
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            id,
        };

        match self.store.append_message(id, Message::user(text)).await {
            Ok(Lookup::Found) => {}
            Ok(Lookup::NotFound) => return SendOutcome::ConversationNotFound,
            Err(e) => warn!(conversation_id = %id, error = %e, "user message not persisted"),
        }

        let engine = self.engine.current();
        let store = Arc::clone(&self.store);
        let prompt = text.to_string();

        let task = tokio::spawn(async move {
            let _guard = guard;

            let (reply, kind) = match engine {
                None => (NO_MODEL_REPLY.to_string(), ReplyKind::NoModel),
                Some(handle) => {
                    match tokio::task::spawn_blocking(move || handle.generate(&prompt)).await {
                        Ok(Ok(text)) => (text, ReplyKind::Generated),
                        Ok(Err(e)) => {
                            warn!(conversation_id = %id, error = %e, "generation failed");
                            (format!("Error: {}", failure_reason(&e)), ReplyKind::EngineFailed)
                        }
                        Err(e) => {
                            warn!(conversation_id = %id, error = %e, "generation task aborted");
                            (format!("Error: {e}"), ReplyKind::EngineFailed)
                        }
                    }
                }
            };

            let appended = match store.append_message(id, Message::model(reply.clone())).await {
                Ok(lookup) => lookup.is_found(),
                Err(e) => {
                    warn!(conversation_id = %id, error = %e, "reply not persisted");
                    true
                }
            };
            info!(conversation_id = %id, kind = ?kind, appended, "generation finished");

            GenerationReport {
                conversation_id: id,
                reply,
                kind,
                appended,
            }
        });

        SendOutcome::Started(GenerationHandle {
            conversation_id: id,
            task,
        })
    }

    pub fn is_generating(&self, id: ConversationId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Ids of every conversation with a generation in flight, ascending.
    pub fn generating(&self) -> Vec<ConversationId> {
        let mut ids: Vec<ConversationId> = self.in_flight.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }
}

fn failure_reason(error: &ParlorError) -> String {
    match error {
        ParlorError::Engine { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::{Conversation, EngineHandle};
    use parlor_storage::Preferences;
    use parlor_test_utils::{MemoryKeyValueStore, MockEngine};

    fn pipeline_with(
        conversations: Vec<Conversation>,
        engine: Option<Arc<MockEngine>>,
    ) -> (Arc<ConversationStore>, Arc<EngineSlot>, GenerationPipeline) {
        let prefs = Preferences::new(Arc::new(MemoryKeyValueStore::new()));
        let store = Arc::new(ConversationStore::with_conversations(prefs, conversations));
        let slot = Arc::new(EngineSlot::new());
        if let Some(engine) = engine {
            slot.install(EngineHandle::new("/models/test.gguf", engine));
        }
        let pipeline = GenerationPipeline::new(Arc::clone(&store), Arc::clone(&slot));
        (store, slot, pipeline)
    }

    fn started(outcome: SendOutcome) -> GenerationHandle {
        match outcome {
            SendOutcome::Started(handle) => handle,
            other => panic!("expected Started, got {other:?}"),
        }
    }

    fn chat_one() -> Vec<Conversation> {
        vec![Conversation::new(ConversationId(1))]
    }

    #[tokio::test]
    async fn hello_world_exchange() {
        let engine = Arc::new(MockEngine::with_responses(vec!["World".into()]));
        let (store, _slot, pipeline) = pipeline_with(chat_one(), Some(engine.clone()));

        let report = started(pipeline.send_message(ConversationId(1), "Hello").await)
            .wait()
            .await
            .unwrap();
        assert_eq!(report.kind, ReplyKind::Generated);
        assert!(report.appended);

        let messages = store.get(ConversationId(1)).await.unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!((messages[0].text.as_str(), messages[0].is_from_user), ("Hello", true));
        assert_eq!((messages[1].text.as_str(), messages[1].is_from_user), ("World", false));
        assert_eq!(engine.prompts(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn blank_text_is_ignored() {
        let (store, _slot, pipeline) = pipeline_with(chat_one(), None);
        assert!(matches!(pipeline.send_message(ConversationId(1), "").await, SendOutcome::Ignored));
        assert!(matches!(pipeline.send_message(ConversationId(1), "   ").await, SendOutcome::Ignored));
        assert!(store.get(ConversationId(1)).await.unwrap().messages.is_empty());
        assert!(!pipeline.is_generating(ConversationId(1)));
    }

    #[tokio::test]
    async fn no_engine_appends_sentinel() {
        let (store, _slot, pipeline) = pipeline_with(chat_one(), None);
        let report = started(pipeline.send_message(ConversationId(1), "hi").await)
            .wait()
            .await
            .unwrap();
        assert_eq!(report.kind, ReplyKind::NoModel);

        let messages = store.get(ConversationId(1)).await.unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hi");
        assert_eq!(messages[1].text, NO_MODEL_REPLY);
        assert!(!messages[1].is_from_user);
    }

    #[tokio::test]
    async fn engine_failure_becomes_error_reply() {
        let engine = Arc::new(MockEngine::failing("model crashed"));
        let (store, _slot, pipeline) = pipeline_with(chat_one(), Some(engine));
        let report = started(pipeline.send_message(ConversationId(1), "hi").await)
            .wait()
            .await
            .unwrap();
        assert_eq!(report.kind, ReplyKind::EngineFailed);
        assert_eq!(report.reply, "Error: model crashed");
        let messages = store.get(ConversationId(1)).await.unwrap().messages;
        assert_eq!(messages[1].text, "Error: model crashed");
    }

    #[tokio::test]
    async fn unknown_conversation_releases_flag() {
        let (_store, _slot, pipeline) = pipeline_with(chat_one(), None);
        assert!(matches!(
            pipeline.send_message(ConversationId(9), "hi").await,
            SendOutcome::ConversationNotFound
        ));
        assert!(!pipeline.is_generating(ConversationId(9)));
    }

    #[tokio::test]
    async fn second_send_on_same_conversation_is_busy() {
        let engine = Arc::new(MockEngine::with_responses(vec!["one".into(), "two".into()]));
        let gate = engine.hold();
        let conversations = vec![
            Conversation::new(ConversationId(1)),
            Conversation::new(ConversationId(2)),
        ];
        let (store, _slot, pipeline) = pipeline_with(conversations, Some(engine.clone()));

        let first = started(pipeline.send_message(ConversationId(1), "a").await);
        assert!(pipeline.is_generating(ConversationId(1)));
        assert!(matches!(
            pipeline.send_message(ConversationId(1), "b").await,
            SendOutcome::Busy
        ));

        let other = started(pipeline.send_message(ConversationId(2), "c").await);
        assert_eq!(pipeline.generating(), vec![ConversationId(1), ConversationId(2)]);

        gate.release();
        first.wait().await.unwrap();
        other.wait().await.unwrap();
        assert!(pipeline.generating().is_empty());

        // The rejected send never appended anything.
        let first_messages = store.get(ConversationId(1)).await.unwrap().messages;
        assert_eq!(first_messages.len(), 2);
        assert_eq!(first_messages[0].text, "a");
    }

    #[tokio::test]
    async fn reply_after_delete_is_dropped() {
        let engine = Arc::new(MockEngine::with_responses(vec!["late".into()]));
        let gate = engine.hold();
        let conversations = vec![
            Conversation::new(ConversationId(1)),
            Conversation::new(ConversationId(2)),
        ];
        let (store, _slot, pipeline) = pipeline_with(conversations, Some(engine));

        let handle = started(pipeline.send_message(ConversationId(1), "hi").await);
        store.delete(ConversationId(1)).await.unwrap();
        gate.release();

        let report = handle.wait().await.unwrap();
        assert!(!report.appended);
        assert!(store.get(ConversationId(1)).await.is_none());
        assert!(!pipeline.is_generating(ConversationId(1)));
    }

    #[tokio::test]
    async fn engine_is_captured_at_send_time() {
        let engine = Arc::new(MockEngine::with_responses(vec!["from old".into()]));
        let gate = engine.hold();
        let (_store, slot, pipeline) = pipeline_with(chat_one(), Some(engine));

        let handle = started(pipeline.send_message(ConversationId(1), "hi").await);
        slot.clear();
        gate.release();

        let report = handle.wait().await.unwrap();
        assert_eq!(report.reply, "from old");
        assert_eq!(report.kind, ReplyKind::Generated);
    }

    #[tokio::test]
    async fn panicking_engine_still_clears_flag() {
        let engine = Arc::new(MockEngine::panicking());
        let (store, _slot, pipeline) = pipeline_with(chat_one(), Some(engine));

        let report = started(pipeline.send_message(ConversationId(1), "boom").await)
            .wait()
            .await
            .unwrap();
        assert_eq!(report.kind, ReplyKind::EngineFailed);
        assert!(!pipeline.is_generating(ConversationId(1)));
        assert_eq!(store.get(ConversationId(1)).await.unwrap().messages.len(), 2);
    }
}
