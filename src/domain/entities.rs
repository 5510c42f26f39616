//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/Elasticsearch types here; these are mapped from adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the sender of an inbound message.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: i64,
    /// Canonical transport username, if the account has one. Anonymous and
    /// deleted accounts have none.
    pub username: Option<String>,
    pub display_name: String,
}

/// One inbound chat event, immutable once mapped from the transport.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: i32,
    pub chat_id: i64,
    pub sender: Option<Sender>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Originated from this bot itself. Such messages are never processed.
    pub is_self: bool,
    /// Edit of a previously seen message. Edits re-enter the same pipeline.
    pub is_edit: bool,
}

/// What the chat transport yields to the dispatcher.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// A new or edited message, in transport arrival order.
    Message(ChatMessage),
    /// The transport finished replaying events buffered while the connection
    /// was being established; everything after this marker is live traffic.
    CaughtUp,
}

/// Outcome of the access policy for one message. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny { reason: String },
}

/// Fuzzy tolerance of the match clause. `Auto` scales the allowed edit
/// distance with term length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fuzziness {
    Auto,
}

/// How multiple terms in the query combine. `And` requires every term to
/// match (fuzzily) in the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    And,
}

/// Recency order applied to the archive's timestamp field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    #[serde(rename = "desc")]
    NewestFirst,
}

/// A structured fuzzy query against the message archive. Built fresh per
/// accepted message; immutable once built. Always caps at one hit,
/// newest-first, so recency is the only tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free-text term matched against the archived message text.
    pub term: String,
    pub fuzziness: Fuzziness,
    pub operator: MatchOperator,
    pub sort: SortOrder,
    pub limit: usize,
    /// Index pattern, e.g. `telegram*` for time-sharded indices.
    pub index_pattern: String,
}

/// Sender fields of an archived message. All optional: the archive contains
/// records for deleted accounts and users without usernames or last names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveSender {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
}

/// A single archived message record, as stored in the search backend.
/// `timestamp` stays a raw string here; it is parsed at formatting time.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveHit {
    pub chat: String,
    pub timestamp: String,
    #[serde(default)]
    pub sender: ArchiveSender,
    pub message: String,
}

/// Rendering mode for replies. Selected once per run, not per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    Text,
    Json,
}

/// Resolved provenance fields of a hit. Field order is the stable key order
/// of the JSON rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceEntry {
    pub chat: String,
    pub time: String,
    pub login: String,
    pub name: String,
    pub message: String,
}

/// The provenance answer for one lookup: either the best archived match or
/// an explicit not-found marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvenanceRecord {
    NotFound,
    Entry(ProvenanceEntry),
}
