//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use async_trait::async_trait;

use crate::domain::{ArchiveHit, ChatEvent, ChatMessage, DomainError, SearchRequest};

/// Chat transport gateway. One persistent event subscription plus replies.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Wait for the next event, in transport arrival order. Events buffered
    /// while the connection was being established are delivered first, then
    /// [`ChatEvent::CaughtUp`], then live traffic.
    async fn next_event(&self) -> Result<ChatEvent, DomainError>;

    /// Send `body` as a reply addressed to the originating message.
    async fn reply(&self, to: &ChatMessage, body: &str) -> Result<(), DomainError>;
}

/// Search backend gateway. Executes one structured query, returns the single
/// best hit or none.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Option<ArchiveHit>, DomainError>;
}
