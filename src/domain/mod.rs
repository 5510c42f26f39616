//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    AccessDecision, ArchiveHit, ArchiveSender, ChatEvent, ChatMessage, Fuzziness, MatchOperator,
    ProvenanceEntry, ProvenanceRecord, ReplyFormat, SearchRequest, Sender, SortOrder,
};
pub use errors::DomainError;
