// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation store: the in-memory conversation list, the active
//! selection, and the write-through to the `conversations_json` key.
//!
//! Every mutation takes the state lock and holds it across the persistence
//! write, so snapshots reach storage in the order the mutations happened.
//! When a write fails the mutation is kept in memory and the storage error
//! is returned; an `Err` therefore always means the target existed.

use std::collections::HashSet;

use parlor_core::{Conversation, ConversationId, Lookup, Message, ParlorError};
use parlor_storage::Preferences;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Point-in-time copy of the store, for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub conversations: Vec<Conversation>,
    pub active_id: Option<ConversationId>,
}

struct StoreState {
    conversations: Vec<Conversation>,
    active_id: Option<ConversationId>,
    /// Highest id handed out by `create` in this process.
    highest_issued: u64,
}

impl StoreState {
    fn position(&self, id: ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    fn next_id(&self) -> Result<ConversationId, ParlorError> {
        let max_existing = self.conversations.iter().map(|c| c.id.0).max().unwrap_or(0);
        max_existing
            .max(self.highest_issued)
            .checked_add(1)
            .map(ConversationId)
            .ok_or_else(|| ParlorError::Internal("conversation ids exhausted".into()))
    }
}

/// Owns every conversation and the active selection.
pub struct ConversationStore {
    state: Mutex<StoreState>,
    preferences: Preferences,
}

impl ConversationStore {
    /// Loads the persisted conversation list.
    ///
    /// A missing, empty, or unreadable list yields a single empty "Chat 1".
    /// The first conversation becomes active.
    pub async fn load(preferences: Preferences) -> Result<Self, ParlorError> {
        let conversations = match preferences.conversations_json().await? {
            None => Vec::new(),
            Some(raw) if raw.trim().is_empty() => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<Conversation>>(&raw) {
                Ok(list) => list,
                Err(e) => {
                    warn!(error = %e, "persisted conversations unreadable, starting fresh");
                    Vec::new()
                }
            },
        };

        let conversations = if conversations.is_empty() {
            vec![Conversation::new(ConversationId(1))]
        } else {
            conversations
        };

        let store = Self::with_conversations(preferences, conversations);
        info!(
            count = store.state.lock().await.conversations.len(),
            "conversations loaded"
        );
        Ok(store)
    }

    /// Builds a store over an explicit list without reading storage.
    ///
    /// Later duplicates of an id are dropped.
    pub fn with_conversations(preferences: Preferences, conversations: Vec<Conversation>) -> Self {
        let mut seen = HashSet::new();
        let conversations: Vec<Conversation> = conversations
            .into_iter()
            .filter(|c| {
                let fresh = seen.insert(c.id);
                if !fresh {
                    warn!(conversation_id = %c.id, "dropping duplicate conversation id");
                }
                fresh
            })
            .collect();
        let active_id = conversations.first().map(|c| c.id);

        Self {
            state: Mutex::new(StoreState {
                conversations,
                active_id,
                highest_issued: 0,
            }),
            preferences,
        }
    }

    /// Creates an empty conversation, makes it active, and persists.
    ///
    /// The conversation is created even if the write fails; the error is
    /// returned so the caller can surface it.
    pub async fn create(&self) -> Result<Conversation, ParlorError> {
        let mut state = self.state.lock().await;
        let id = state.next_id()?;
        let conversation = Conversation::new(id);
        state.highest_issued = id.0;
        state.conversations.push(conversation.clone());
        state.active_id = Some(id);
        debug!(conversation_id = %id, "conversation created");

        self.persist(&state).await?;
        Ok(conversation)
    }

    /// Removes a conversation. If it was active, the first remaining one
    /// becomes active.
    pub async fn delete(&self, id: ConversationId) -> Result<Lookup, ParlorError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.position(id) else {
            return Ok(Lookup::NotFound);
        };
        state.conversations.remove(index);
        if state.active_id == Some(id) {
            state.active_id = state.conversations.first().map(|c| c.id);
        }
        debug!(conversation_id = %id, active = ?state.active_id, "conversation deleted");

        self.persist(&state).await?;
        Ok(Lookup::Found)
    }

    /// Makes `id` the active conversation. Unknown ids leave the selection as is.
    ///
    /// The selection is not part of the persisted list, so nothing is written.
    pub async fn select(&self, id: ConversationId) -> Result<Lookup, ParlorError> {
        let mut state = self.state.lock().await;
        if state.position(id).is_none() {
            return Ok(Lookup::NotFound);
        }
        state.active_id = Some(id);
        debug!(conversation_id = %id, "conversation selected");
        Ok(Lookup::Found)
    }

    /// Appends `message` to the conversation `id`.
    ///
    /// A missing id (including one deleted while a reply was being generated)
    /// is a no-op.
    pub async fn append_message(
        &self,
        id: ConversationId,
        message: Message,
    ) -> Result<Lookup, ParlorError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.position(id) else {
            debug!(conversation_id = %id, "append to missing conversation ignored");
            return Ok(Lookup::NotFound);
        };
        let updated = state.conversations[index].with_message(message);
        state.conversations[index] = updated;

        self.persist(&state).await?;
        Ok(Lookup::Found)
    }

    pub async fn rename(
        &self,
        id: ConversationId,
        name: impl Into<String>,
    ) -> Result<Lookup, ParlorError> {
        let name: String = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(ParlorError::InvalidInput(
                "conversation name must not be blank".into(),
            ));
        }

        let mut state = self.state.lock().await;
        let Some(index) = state.position(id) else {
            return Ok(Lookup::NotFound);
        };
        let updated = state.conversations[index].renamed(name);
        state.conversations[index] = updated;

        self.persist(&state).await?;
        Ok(Lookup::Found)
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().await.conversations.clone()
    }

    pub async fn get(&self, id: ConversationId) -> Option<Conversation> {
        let state = self.state.lock().await;
        state.position(id).map(|i| state.conversations[i].clone())
    }

    pub async fn active_id(&self) -> Option<ConversationId> {
        self.state.lock().await.active_id
    }

    pub async fn active(&self) -> Option<Conversation> {
        let state = self.state.lock().await;
        state
            .active_id
            .and_then(|id| state.position(id))
            .map(|i| state.conversations[i].clone())
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock().await;
        StoreSnapshot {
            conversations: state.conversations.clone(),
            active_id: state.active_id,
        }
    }

    async fn persist(&self, state: &StoreState) -> Result<(), ParlorError> {
        let json = serde_json::to_string(&state.conversations)?;
        if let Err(e) = self.preferences.set_conversations_json(&json).await {
            warn!(error = %e, "failed to persist conversations, keeping in-memory state");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_test_utils::MemoryKeyValueStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn empty_store() -> (Arc<MemoryKeyValueStore>, ConversationStore) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = ConversationStore::with_conversations(Preferences::new(kv.clone()), Vec::new());
        (kv, store)
    }

    fn persisted(kv: &MemoryKeyValueStore) -> Vec<Conversation> {
        let raw = kv.value(parlor_storage::CONVERSATIONS_KEY).expect("persisted");
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn load_without_data_starts_with_chat_one() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = ConversationStore::load(Preferences::new(kv)).await.unwrap();
        let conversations = store.conversations().await;
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].name, "Chat 1");
        assert_eq!(store.active_id().await, Some(ConversationId(1)));
    }

    #[tokio::test]
    async fn load_with_garbage_json_starts_fresh() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.insert(parlor_storage::CONVERSATIONS_KEY, "{not json");
        let store = ConversationStore::load(Preferences::new(kv)).await.unwrap();
        assert_eq!(store.conversations().await.len(), 1);
    }

    #[tokio::test]
    async fn load_drops_duplicate_ids() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.insert(
            parlor_storage::CONVERSATIONS_KEY,
            r#"[{"id":4,"name":"A","messages":[]},{"id":4,"name":"B","messages":[]}]"#,
        );
        let store = ConversationStore::load(Preferences::new(kv)).await.unwrap();
        let conversations = store.conversations().await;
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].name, "A");
        assert_eq!(store.active_id().await, Some(ConversationId(4)));
    }

    #[tokio::test]
    async fn ids_are_never_reused_after_delete() {
        let (_kv, store) = empty_store();
        assert_eq!(store.create().await.unwrap().id, ConversationId(1));
        assert_eq!(store.create().await.unwrap().id, ConversationId(2));
        assert_eq!(store.delete(ConversationId(1)).await.unwrap(), Lookup::Found);
        assert_eq!(store.create().await.unwrap().id, ConversationId(3));
    }

    #[tokio::test]
    async fn deleting_the_newest_does_not_recycle_its_id() {
        let (_kv, store) = empty_store();
        store.create().await.unwrap();
        let second = store.create().await.unwrap();
        store.delete(second.id).await.unwrap();
        assert_eq!(store.create().await.unwrap().id, ConversationId(3));
    }

    #[tokio::test]
    async fn create_activates_and_persists() {
        let (kv, store) = empty_store();
        let created = store.create().await.unwrap();
        assert_eq!(created.name, "Chat 1");
        assert_eq!(store.active_id().await, Some(created.id));
        assert_eq!(persisted(&kv), vec![created]);
    }

    #[tokio::test]
    async fn deleting_active_moves_selection_to_first() {
        let (_kv, store) = empty_store();
        let a = store.create().await.unwrap();
        let _b = store.create().await.unwrap();
        let c = store.create().await.unwrap();
        assert_eq!(store.active_id().await, Some(c.id));
        store.delete(c.id).await.unwrap();
        assert_eq!(store.active_id().await, Some(a.id));
    }

    #[tokio::test]
    async fn deleting_last_clears_selection() {
        let (_kv, store) = empty_store();
        let only = store.create().await.unwrap();
        store.delete(only.id).await.unwrap();
        assert_eq!(store.active_id().await, None);
        assert!(store.active().await.is_none());
    }

    #[tokio::test]
    async fn delete_unknown_id_does_not_write() {
        let (kv, store) = empty_store();
        store.create().await.unwrap();
        let writes = kv.write_count();
        assert_eq!(store.delete(ConversationId(99)).await.unwrap(), Lookup::NotFound);
        assert_eq!(kv.write_count(), writes);
    }

    #[tokio::test]
    async fn create_fails_cleanly_when_ids_run_out() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let last = Conversation::new(ConversationId(u64::MAX));
        let store =
            ConversationStore::with_conversations(Preferences::new(kv.clone()), vec![last.clone()]);

        let err = store.create().await.unwrap_err();
        assert!(matches!(err, ParlorError::Internal(_)));
        assert_eq!(store.conversations().await, vec![last]);
        assert_eq!(kv.write_count(), 0);
    }

    #[tokio::test]
    async fn select_switches_without_writing() {
        let (kv, store) = empty_store();
        let a = store.create().await.unwrap();
        store.create().await.unwrap();
        let writes = kv.write_count();

        assert_eq!(store.select(a.id).await.unwrap(), Lookup::Found);
        assert_eq!(store.active_id().await, Some(a.id));
        assert_eq!(kv.write_count(), writes);
    }

    #[tokio::test]
    async fn select_unknown_id_keeps_selection() {
        let (_kv, store) = empty_store();
        let a = store.create().await.unwrap();
        assert_eq!(store.select(ConversationId(42)).await.unwrap(), Lookup::NotFound);
        assert_eq!(store.active_id().await, Some(a.id));
    }

    #[tokio::test]
    async fn append_after_delete_changes_nothing() {
        let (kv, store) = empty_store();
        let a = store.create().await.unwrap();
        let b = store.create().await.unwrap();
        store.delete(a.id).await.unwrap();
        let before = store.snapshot().await;
        let writes = kv.write_count();

        let result = store.append_message(a.id, Message::model("late")).await.unwrap();
        assert_eq!(result, Lookup::NotFound);
        assert_eq!(store.snapshot().await, before);
        assert_eq!(kv.write_count(), writes);
        assert!(store.get(b.id).await.unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn append_replaces_conversation_value() {
        let (kv, store) = empty_store();
        let a = store.create().await.unwrap();
        store.append_message(a.id, Message::user("Hello")).await.unwrap();
        store.append_message(a.id, Message::model("World")).await.unwrap();

        let stored = store.get(a.id).await.unwrap();
        let texts: Vec<_> = stored.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["Hello", "World"]);
        assert_eq!(persisted(&kv)[0], stored);
    }

    #[tokio::test]
    async fn persisted_list_loads_back_equal() {
        let (kv, store) = empty_store();
        let a = store.create().await.unwrap();
        store.create().await.unwrap();
        store.append_message(a.id, Message::user("hi")).await.unwrap();
        store.rename(a.id, "Groceries").await.unwrap();
        let original = store.conversations().await;

        let reloaded = ConversationStore::load(Preferences::new(kv)).await.unwrap();
        assert_eq!(reloaded.conversations().await, original);
    }

    #[tokio::test]
    async fn rename_rejects_blank_names() {
        let (_kv, store) = empty_store();
        let a = store.create().await.unwrap();
        let err = store.rename(a.id, "   ").await.unwrap_err();
        assert!(matches!(err, ParlorError::InvalidInput(_)));
        assert_eq!(store.get(a.id).await.unwrap().name, "Chat 1");
        assert_eq!(
            store.rename(ConversationId(7), "x").await.unwrap(),
            Lookup::NotFound
        );
    }

    #[tokio::test]
    async fn failed_write_keeps_mutation_in_memory() {
        let (kv, store) = empty_store();
        kv.fail_writes(true);
        let err = store.create().await.unwrap_err();
        assert!(matches!(err, ParlorError::Storage { .. }));
        assert_eq!(store.conversations().await.len(), 1);
        assert_eq!(store.active_id().await, Some(ConversationId(1)));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create,
        Delete(u64),
        Select(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Create),
            (0u64..8).prop_map(Op::Delete),
            (0u64..8).prop_map(Op::Select),
        ]
    }

    proptest! {
        #[test]
        fn active_id_always_names_an_existing_conversation(ops in prop::collection::vec(op(), 0..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (_kv, store) = empty_store();
                let mut issued = HashSet::new();
                for op in ops {
                    match op {
                        Op::Create => {
                            let created = store.create().await.unwrap();
                            prop_assert!(issued.insert(created.id), "duplicate id {}", created.id);
                        }
                        Op::Delete(id) => { store.delete(ConversationId(id)).await.unwrap(); }
                        Op::Select(id) => { store.select(ConversationId(id)).await.unwrap(); }
                    }
                    let snapshot = store.snapshot().await;
                    if let Some(active) = snapshot.active_id {
                        prop_assert!(snapshot.conversations.iter().any(|c| c.id == active));
                    } else {
                        prop_assert!(snapshot.conversations.is_empty());
                    }
                }
                Ok(())
            })?;
        }
    }
}
