//! In-memory message store for exercising the core without a database.
//!
//! Also the vehicle for fault injection: flipping `fail_writes` makes the
//! durability point fail, which the persist-before-broadcast tests rely on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use parley_store::{MessageStore, NewMessage, Reaction, StoreError, StoreResult, StoredMessage};

#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<HashMap<String, StoredMessage>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn message(&self, message_id: &str) -> Option<StoredMessage> {
        self.messages.lock().unwrap().get(message_id).cloned()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Mark a message soft-deleted, as the external moderation surface would.
    pub fn soft_delete(&self, message_id: &str) {
        if let Some(message) = self.messages.lock().unwrap().get_mut(message_id) {
            message.deleted = true;
        }
    }

    fn write_error() -> StoreError {
        // Any StoreError works here; a serialization failure is the cheapest
        // one to construct without a database handle.
        StoreError::Serialization(serde_json::from_str::<serde_json::Value>("").unwrap_err())
    }
}

impl MessageStore for MemoryMessageStore {
    async fn create_message(&self, new: NewMessage) -> StoreResult<StoredMessage> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }

        let id = format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = chrono::Utc::now().to_rfc3339();
        let message = StoredMessage {
            id: id.clone(),
            room_id: new.room_id,
            sender_id: new.sender_id,
            sender_username: new.sender_username,
            sender_avatar: new.sender_avatar,
            content: new.content,
            message_type: new.message_type,
            reply_to: new.reply_to,
            file: new.file,
            reactions: Vec::new(),
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        };

        self.messages.lock().unwrap().insert(id, message.clone());
        Ok(message)
    }

    async fn get_message(&self, message_id: &str) -> StoreResult<Option<StoredMessage>> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .get(message_id)
            .filter(|message| !message.deleted)
            .cloned())
    }

    async fn update_reactions(&self, message_id: &str, reactions: &[Reaction]) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }

        let mut messages = self.messages.lock().unwrap();
        match messages.get_mut(message_id).filter(|m| !m.deleted) {
            Some(message) => {
                message.reactions = reactions.to_vec();
                message.updated_at = chrono::Utc::now().to_rfc3339();
                Ok(())
            }
            None => Err(StoreError::message_not_found(message_id)),
        }
    }
}
