//! Map grammers types to domain entities.

use crate::domain::{ChatMessage, Sender};
use grammers_client::types::{Chat, Message};

/// Map a grammers message to the domain event payload.
pub fn to_chat_message(message: &Message, is_edit: bool) -> ChatMessage {
    ChatMessage {
        id: message.id(),
        chat_id: message.chat().id(),
        sender: message.sender().as_ref().map(sender_from_chat),
        text: message.text().to_string(),
        timestamp: message.date(),
        is_self: message.outgoing(),
        is_edit,
    }
}

/// Build the domain sender from the sending peer. `name()` is the full name
/// for user senders and the title for channel senders.
pub fn sender_from_chat(chat: &Chat) -> Sender {
    Sender {
        id: chat.id(),
        username: chat.username().map(String::from),
        display_name: chat.name().to_string(),
    }
}
