//! Conversation identity and business rules
//!
//! The manager owns session id generation, record lifecycle, message
//! append ordering, sliding-window prompt assembly, title derivation, and
//! preview generation. It depends on [`FileStore`] for durability and has
//! no direct I/O of its own.
//!
//! # Concurrency
//!
//! The store performs no locking, so the manager serializes
//! load-mutate-persist per session id with a keyed async mutex. Two
//! concurrent turns on the same session can no longer lose an update;
//! independent sessions never contend. The long-latency provider call in
//! [`ConversationManager::chat`] runs between the two critical sections so
//! a slow generation does not block other operations on the session.

use crate::error::{ChatvaultError, Result};
use crate::providers::ChatProvider;
use crate::store::{
    types::truncate_chars, ConversationHistory, ConversationPreview, ConversationRecord,
    FileStore, Turn, TITLE_MAX_CHARS,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Default number of stored turns included in a prompt window
pub const DEFAULT_CONTEXT_TURNS: usize = 5;

/// Default cap on stored turns per conversation (0 = unlimited)
pub const DEFAULT_MAX_STORED_TURNS: usize = 200;

/// Inbound chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// User message text; must be non-empty
    pub message: String,
    /// Per-request system message override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Existing session to continue; a fresh session is created when
    /// absent or unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Outcome of a chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Generated assistant reply
    pub reply: String,
    /// Resolved session id; differs from the request when the server
    /// assigned a new one
    pub session_id: String,
}

/// Business-rule layer over the record store
pub struct ConversationManager {
    store: FileStore,
    default_system_message: String,
    context_turns: usize,
    max_stored_turns: usize,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationManager {
    /// Create a manager over a store
    ///
    /// # Arguments
    ///
    /// * `store` - durable record store
    /// * `default_system_message` - substituted when a turn supplies none
    /// * `context_turns` - stored turns included in a prompt window
    /// * `max_stored_turns` - cap on stored turns per record (0 = unlimited)
    pub fn new(
        store: FileStore,
        default_system_message: impl Into<String>,
        context_turns: usize,
        max_stored_turns: usize,
    ) -> Self {
        Self {
            store,
            default_system_message: default_system_message.into(),
            context_turns,
            max_stored_turns,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Default system message substituted when a turn supplies none
    pub fn default_system_message(&self) -> &str {
        &self.default_system_message
    }

    /// Exclusive critical-section handle for one session id
    ///
    /// Lock table entries are created on demand and never pruned; the
    /// entry count is bounded by the number of distinct sessions touched
    /// by this process.
    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("session lock table poisoned");
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Generate a fresh session id
    fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Start a new conversation and return its session id
    ///
    /// Writes an empty record so the id is immediately readable. The title
    /// stays unset without a hint; the placeholder is applied at render
    /// time so the stored document keeps a null title until derived.
    pub fn start_conversation(&self, title_hint: Option<&str>) -> Result<String> {
        let session_id = Self::new_session_id();
        let record =
            ConversationRecord::new(&session_id, title_hint.map(|t| t.to_string()));
        self.store.put(&record)?;

        tracing::info!(session_id = %session_id, "Started conversation");
        Ok(session_id)
    }

    /// Stored history for a session, or the empty default shape
    ///
    /// Unknown ids are a deliberate non-error: callers render "no history
    /// yet" without special-casing absence. Store I/O and malformed-data
    /// failures still propagate.
    pub fn get_history(&self, session_id: &str) -> Result<ConversationHistory> {
        match self.store.get(session_id) {
            Ok(Some(record)) => Ok(record.into()),
            Ok(None) => Ok(ConversationHistory::default()),
            // Reject ids the store refuses to touch with the same default;
            // a malformed id can never name a stored record.
            Err(e) if is_validation(&e) => Ok(ConversationHistory::default()),
            Err(e) => Err(e),
        }
    }

    /// Append a turn, creating the record implicitly for unknown ids
    ///
    /// Returns the updated record. Runs inside the per-session critical
    /// section.
    pub async fn append_turn(&self, session_id: &str, turn: Turn) -> Result<ConversationRecord> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;
        self.append_turn_locked(session_id, turn)
    }

    /// Load-or-create, append, persist. Caller must hold the session lock.
    fn append_turn_locked(&self, session_id: &str, turn: Turn) -> Result<ConversationRecord> {
        let mut record = self
            .store
            .get(session_id)?
            .unwrap_or_else(|| ConversationRecord::new(session_id, None));

        record.messages.push(turn);
        self.enforce_turn_cap(&mut record);
        record.updated_at = Utc::now();
        self.store.put(&record)?;
        Ok(record)
    }

    /// Drop oldest turns once a record grows past the configured cap
    fn enforce_turn_cap(&self, record: &mut ConversationRecord) {
        if self.max_stored_turns == 0 {
            return;
        }
        let excess = record.messages.len().saturating_sub(self.max_stored_turns);
        if excess > 0 {
            record.messages.drain(..excess);
            tracing::debug!(
                session_id = %record.session_id,
                dropped = excess,
                "Trimmed conversation to stored-turn cap"
            );
        }
    }

    /// Bounded prompt window for a session
    ///
    /// Returns the system entry followed by the last `max_turns` stored
    /// turns in original order; fewer when the conversation is shorter.
    /// `max_turns` counts turns, not tokens. The system entry is always
    /// first regardless of what is stored; when the caller supplies none,
    /// the process-wide default is substituted.
    pub fn build_prompt_window(
        &self,
        system_message: Option<&str>,
        session_id: &str,
        max_turns: usize,
    ) -> Result<Vec<Turn>> {
        let system = system_message.unwrap_or(&self.default_system_message);
        let mut window = vec![Turn::system(system)];

        if let Some(record) = self.store.get(session_id)? {
            let skip = record.messages.len().saturating_sub(max_turns);
            window.extend(record.messages.into_iter().skip(skip));
        }

        Ok(window)
    }

    /// Overwrite the stored title
    ///
    /// Returns `Ok(false)` when the session does not exist; never creates
    /// a record as a side effect. An empty title is a validation error
    /// with no state mutation.
    pub async fn update_title(&self, session_id: &str, title: &str) -> Result<bool> {
        if title.trim().is_empty() {
            return Err(ChatvaultError::Validation("title is required".into()).into());
        }

        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let Some(mut record) = self.store.get(session_id)? else {
            return Ok(false);
        };

        record.title = Some(title.to_string());
        record.updated_at = Utc::now();
        self.store.put(&record)?;

        tracing::debug!(session_id = %session_id, "Updated conversation title");
        Ok(true)
    }

    /// Replace `messages` with an empty sequence
    ///
    /// Preserves title and `created_at`, refreshes `updated_at`. Returns
    /// `Ok(false)` when the session does not exist.
    pub async fn clear_messages(&self, session_id: &str) -> Result<bool> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let Some(mut record) = self.store.get(session_id)? else {
            return Ok(false);
        };

        record.messages.clear();
        record.updated_at = Utc::now();
        self.store.put(&record)?;

        tracing::debug!(session_id = %session_id, "Cleared conversation messages");
        Ok(true)
    }

    /// Delete a conversation entirely
    ///
    /// Subsequent reads behave as "not found", not as an empty record.
    pub fn delete_conversation(&self, session_id: &str) -> Result<bool> {
        let deleted = self.store.delete(session_id)?;
        if deleted {
            tracing::info!(session_id = %session_id, "Deleted conversation");
        }
        Ok(deleted)
    }

    /// Previews of every stored conversation, most recently active first
    ///
    /// `updated_at` descending is the only externally visible ordering
    /// guarantee; ties are unspecified.
    pub fn list_conversations(&self) -> Result<Vec<ConversationPreview>> {
        let mut previews: Vec<ConversationPreview> = self
            .store
            .list_all()?
            .iter()
            .map(ConversationPreview::from_record)
            .collect();

        previews.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(previews)
    }

    /// Process one inbound chat turn
    ///
    /// Resolves or creates the session, persists the user turn (deriving
    /// the title on a conversation's first turn), asks the provider for a
    /// reply over a bounded prompt window, and persists the assistant
    /// turn. A failed generation leaves the user turn durable with no
    /// assistant turn and surfaces a provider error; nothing is rolled
    /// back or retried here.
    pub async fn chat(
        &self,
        provider: &dyn ChatProvider,
        request: ChatRequest,
    ) -> Result<ChatResponse> {
        if request.message.trim().is_empty() {
            return Err(ChatvaultError::Validation("message is required".into()).into());
        }

        // An unknown, malformed, or absent session id all mean a fresh
        // session; the response carries the resolved id either way.
        let session_id = match request.session_id {
            Some(id) => match self.store.get(&id) {
                Ok(Some(_)) => id,
                Ok(None) => Self::new_session_id(),
                Err(e) if is_validation(&e) => Self::new_session_id(),
                Err(e) => return Err(e),
            },
            None => Self::new_session_id(),
        };

        {
            let lock = self.session_lock(&session_id);
            let _guard = lock.lock().await;

            let mut record = self
                .store
                .get(&session_id)?
                .unwrap_or_else(|| ConversationRecord::new(&session_id, None));

            // First-turn check happens before the append: a title is
            // derived exactly once, when the record holds zero turns.
            if record.messages.is_empty() && record.title.is_none() {
                record.title = Some(truncate_chars(&request.message, TITLE_MAX_CHARS));
                tracing::debug!(
                    session_id = %session_id,
                    title = %record.title.as_deref().unwrap_or_default(),
                    "Derived title from first turn"
                );
            }

            record.messages.push(Turn::user(&request.message));
            self.enforce_turn_cap(&mut record);
            record.updated_at = Utc::now();
            self.store.put(&record)?;
        }

        let window = self.build_prompt_window(
            request.system_message.as_deref(),
            &session_id,
            self.context_turns,
        )?;

        // The user turn is already durable; a provider failure surfaces
        // here and leaves the record in the correct retryable state.
        let reply = provider.generate_reply(&window).await?;

        {
            let lock = self.session_lock(&session_id);
            let _guard = lock.lock().await;
            self.append_turn_locked(&session_id, Turn::assistant(&reply))?;
        }

        Ok(ChatResponse { reply, session_id })
    }
}

/// Whether an error is (or wraps) a validation error
fn is_validation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<ChatvaultError>(),
        Some(ChatvaultError::Validation(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;
    use tempfile::tempdir;

    fn create_test_manager() -> (ConversationManager, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let store = FileStore::new_with_dir(dir.path()).expect("failed to create store");
        let manager = ConversationManager::new(
            store,
            "You are a helpful assistant.",
            DEFAULT_CONTEXT_TURNS,
            DEFAULT_MAX_STORED_TURNS,
        );
        (manager, dir)
    }

    #[test]
    fn test_start_conversation_immediately_readable() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).expect("start failed");

        let history = manager.get_history(&id).expect("history failed");
        assert!(history.messages.is_empty());
        assert!(history.title.is_none());
        assert!(history.created_at.is_some());
    }

    #[test]
    fn test_start_conversation_with_title_hint() {
        let (manager, _dir) = create_test_manager();
        let id = manager
            .start_conversation(Some("Planning session"))
            .expect("start failed");

        let history = manager.get_history(&id).expect("history failed");
        assert_eq!(history.title.as_deref(), Some("Planning session"));
    }

    #[test]
    fn test_start_conversation_ids_are_unique() {
        let (manager, _dir) = create_test_manager();
        let a = manager.start_conversation(None).unwrap();
        let b = manager.start_conversation(None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_get_history_unknown_id_is_empty_default() {
        let (manager, _dir) = create_test_manager();
        let history = manager
            .get_history("00000000-0000-0000-0000-000000000000")
            .expect("history failed");
        assert!(history.messages.is_empty());
        assert!(history.title.is_none());
        assert!(history.created_at.is_none());
        assert!(history.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_append_turn_then_history_ends_with_turn() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();

        manager
            .append_turn(&id, Turn::user("first"))
            .await
            .expect("append failed");
        manager
            .append_turn(&id, Turn::assistant("second"))
            .await
            .expect("append failed");

        let history = manager.get_history(&id).unwrap();
        assert_eq!(history.messages.len(), 2);
        assert_eq!(history.messages.last().unwrap().content, "second");
    }

    #[tokio::test]
    async fn test_append_turn_creates_unknown_session() {
        let (manager, _dir) = create_test_manager();
        let id = Uuid::new_v4().to_string();

        let record = manager
            .append_turn(&id, Turn::user("implicit"))
            .await
            .expect("append failed");

        assert_eq!(record.session_id, id);
        assert_eq!(record.messages.len(), 1);
        assert_eq!(manager.get_history(&id).unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_append_turn_advances_updated_at() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();
        let before = manager.get_history(&id).unwrap().updated_at.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        manager.append_turn(&id, Turn::user("x")).await.unwrap();

        let after = manager.get_history(&id).unwrap().updated_at.unwrap();
        assert!(after > before);
    }

    #[tokio::test]
    async fn test_prompt_window_seven_turns_window_five() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();
        for i in 0..7 {
            manager
                .append_turn(&id, Turn::user(format!("turn {}", i)))
                .await
                .unwrap();
        }

        let window = manager
            .build_prompt_window(Some("sys"), &id, 5)
            .expect("window failed");

        assert_eq!(window.len(), 6);
        assert_eq!(window[0].role, Role::System);
        assert_eq!(window[0].content, "sys");
        assert_eq!(window[1].content, "turn 2");
        assert_eq!(window[5].content, "turn 6");
    }

    #[tokio::test]
    async fn test_prompt_window_shorter_conversation() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();
        manager.append_turn(&id, Turn::user("only")).await.unwrap();

        let window = manager.build_prompt_window(Some("sys"), &id, 5).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[1].content, "only");
    }

    #[test]
    fn test_prompt_window_uses_default_system_message() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();

        let window = manager.build_prompt_window(None, &id, 5).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].content, "You are a helpful assistant.");
    }

    #[test]
    fn test_prompt_window_unknown_session_is_system_only() {
        let (manager, _dir) = create_test_manager();
        let window = manager
            .build_prompt_window(Some("sys"), &Uuid::new_v4().to_string(), 5)
            .unwrap();
        assert_eq!(window.len(), 1);
    }

    #[tokio::test]
    async fn test_update_title_overwrites() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();

        let ok = manager.update_title(&id, "Renamed").await.unwrap();
        assert!(ok);
        assert_eq!(
            manager.get_history(&id).unwrap().title.as_deref(),
            Some("Renamed")
        );
    }

    #[tokio::test]
    async fn test_update_title_unknown_session_is_false() {
        let (manager, _dir) = create_test_manager();
        let ok = manager
            .update_title(&Uuid::new_v4().to_string(), "Renamed")
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_update_title_does_not_create_record() {
        let (manager, _dir) = create_test_manager();
        let id = Uuid::new_v4().to_string();
        manager.update_title(&id, "Renamed").await.unwrap();
        assert!(manager.get_history(&id).unwrap().created_at.is_none());
    }

    #[tokio::test]
    async fn test_update_title_empty_is_validation_error() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();

        let err = manager.update_title(&id, "  ").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatvaultError>(),
            Some(ChatvaultError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_messages_preserves_title_and_created_at() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(Some("Keep me")).unwrap();
        manager.append_turn(&id, Turn::user("a")).await.unwrap();
        manager.append_turn(&id, Turn::assistant("b")).await.unwrap();

        let before = manager.get_history(&id).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let ok = manager.clear_messages(&id).await.unwrap();
        assert!(ok);

        let after = manager.get_history(&id).unwrap();
        assert!(after.messages.is_empty());
        assert_eq!(after.title.as_deref(), Some("Keep me"));
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at.unwrap() > before.updated_at.unwrap());
    }

    #[tokio::test]
    async fn test_clear_messages_unknown_session_is_false() {
        let (manager, _dir) = create_test_manager();
        let ok = manager
            .clear_messages(&Uuid::new_v4().to_string())
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_delete_then_history_is_empty_default() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();
        manager.append_turn(&id, Turn::user("x")).await.unwrap();

        let deleted = manager.delete_conversation(&id).unwrap();
        assert!(deleted);

        let history = manager.get_history(&id).unwrap();
        assert!(history.messages.is_empty());
        assert!(history.created_at.is_none());
    }

    #[test]
    fn test_delete_unknown_session_is_false() {
        let (manager, _dir) = create_test_manager();
        assert!(!manager
            .delete_conversation(&Uuid::new_v4().to_string())
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_conversations_sorted_by_updated_at_desc() {
        let (manager, _dir) = create_test_manager();

        let first = manager.start_conversation(Some("first")).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = manager.start_conversation(Some("second")).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let third = manager.start_conversation(Some("third")).unwrap();

        // Touch the first conversation so it becomes the most recent.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        manager.append_turn(&first, Turn::user("bump")).await.unwrap();

        let previews = manager.list_conversations().unwrap();
        assert_eq!(previews.len(), 3);
        assert_eq!(previews[0].id, first);
        assert_eq!(previews[1].id, third);
        assert_eq!(previews[2].id, second);
    }

    #[tokio::test]
    async fn test_list_conversations_title_fallback() {
        let (manager, _dir) = create_test_manager();
        let id = manager.start_conversation(None).unwrap();
        manager
            .append_turn(&id, Turn::user("Fallback title material goes here"))
            .await
            .unwrap();

        let previews = manager.list_conversations().unwrap();
        assert_eq!(previews[0].title, "Fallback title material goes h...");
    }

    #[tokio::test]
    async fn test_turn_cap_drops_oldest() {
        let dir = tempdir().unwrap();
        let store = FileStore::new_with_dir(dir.path()).unwrap();
        let manager = ConversationManager::new(store, "sys", 5, 3);

        let id = manager.start_conversation(None).unwrap();
        for i in 0..5 {
            manager
                .append_turn(&id, Turn::user(format!("m{}", i)))
                .await
                .unwrap();
        }

        let history = manager.get_history(&id).unwrap();
        assert_eq!(history.messages.len(), 3);
        assert_eq!(history.messages[0].content, "m2");
        assert_eq!(history.messages[2].content, "m4");
    }

    #[tokio::test]
    async fn test_turn_cap_zero_means_unlimited() {
        let dir = tempdir().unwrap();
        let store = FileStore::new_with_dir(dir.path()).unwrap();
        let manager = ConversationManager::new(store, "sys", 5, 0);

        let id = manager.start_conversation(None).unwrap();
        for i in 0..10 {
            manager
                .append_turn(&id, Turn::user(format!("m{}", i)))
                .await
                .unwrap();
        }

        assert_eq!(manager.get_history(&id).unwrap().messages.len(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_appends_same_session_are_not_lost() {
        let (manager, _dir) = create_test_manager();
        let manager = std::sync::Arc::new(manager);
        let id = manager.start_conversation(None).unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let manager = manager.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .append_turn(&id, Turn::user(format!("concurrent {}", i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.get_history(&id).unwrap().messages.len(), 8);
    }
}
