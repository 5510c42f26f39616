//! Implements ChatGateway using grammers Client.
//!
//! Delivers the replayed connection backlog first: updates arriving within
//! the grace window count as backlog, and the first idle gap emits the
//! catch-up marker and switches the stream to live delivery.

use crate::adapters::telegram::mapper;
use crate::domain::{ChatEvent, ChatMessage, DomainError};
use crate::ports::ChatGateway;
use async_trait::async_trait;
use grammers_client::types::Chat;
use grammers_client::{Client, InputMessage, Update};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

enum Phase {
    CatchingUp,
    Live,
}

/// Chat gateway adapter. The grammers Client is a cheap clone handle, so
/// concurrent reply calls are fine while next_event polls for updates.
///
/// Interior state sits behind short sync mutex sections with no await
/// inside: once `next_update()` hands over an update, `next_event` returns
/// without further suspension points, so dropping its future at a select
/// boundary cannot lose a dequeued message.
pub struct GrammersChatGateway {
    client: Client,
    catch_up_grace: Duration,
    phase: Mutex<Phase>,
    /// Chats seen this session, so replies can address them without a
    /// dialog round-trip.
    chats: Mutex<HashMap<i64, Chat>>,
}

impl GrammersChatGateway {
    pub fn new(client: Client, catch_up_grace: Duration) -> Self {
        Self {
            client,
            catch_up_grace,
            phase: Mutex::new(Phase::CatchingUp),
            chats: Mutex::new(HashMap::new()),
        }
    }

    /// Remember the originating chat for later replies, then map the update.
    /// `None` for update kinds the bot does not handle.
    fn accept(&self, update: Update) -> Option<ChatMessage> {
        let (message, is_edit) = match update {
            Update::NewMessage(message) => (message, false),
            Update::MessageEdited(message) => (message, true),
            _ => return None,
        };
        let chat = message.chat();
        lock(&self.chats).insert(chat.id(), chat);
        Some(mapper::to_chat_message(&message, is_edit))
    }
}

#[async_trait]
impl ChatGateway for GrammersChatGateway {
    async fn next_event(&self) -> Result<ChatEvent, DomainError> {
        loop {
            let live = matches!(*lock(&self.phase), Phase::Live);
            let update = if live {
                self.client
                    .next_update()
                    .await
                    .map_err(|e| DomainError::ChatGateway(e.to_string()))?
            } else {
                match tokio::time::timeout(self.catch_up_grace, self.client.next_update()).await {
                    Ok(update) => update.map_err(|e| DomainError::ChatGateway(e.to_string()))?,
                    Err(_) => {
                        *lock(&self.phase) = Phase::Live;
                        debug!("no buffered updates within the grace window; switching to live");
                        return Ok(ChatEvent::CaughtUp);
                    }
                }
            };
            if let Some(message) = self.accept(update) {
                return Ok(ChatEvent::Message(message));
            }
        }
    }

    async fn reply(&self, to: &ChatMessage, body: &str) -> Result<(), DomainError> {
        let chat = lock(&self.chats).get(&to.chat_id).cloned().ok_or_else(|| {
            DomainError::ReplySend(format!("chat {} not seen this session", to.chat_id))
        })?;

        self.client
            .send_message(&chat, InputMessage::markdown(body).reply_to(Some(to.id)))
            .await
            .map_err(|e| DomainError::ReplySend(e.to_string()))?;

        debug!(chat_id = to.chat_id, message_id = to.id, "reply sent");
        Ok(())
    }
}

/// Lock a state mutex, recovering the guard when a panic elsewhere
/// poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::AssertUnwindSafe;

    #[test]
    fn test_lock_recovers_poisoned_state() {
        let cache: Mutex<HashMap<i64, String>> =
            Mutex::new(HashMap::from([(7, "General".to_string())]));
        let _ = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock(&cache);
            panic!("poison the cache lock");
        }));

        assert!(cache.is_poisoned());
        assert_eq!(lock(&cache).get(&7).map(String::as_str), Some("General"));
    }
}
