//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Required configuration path absent (or null) with no default.
    /// Fatal at startup; the process must not run on partial configuration.
    #[error("Config option {path} not found in config file")]
    MissingConfigKey { path: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Telegram gateway error: {0}")]
    ChatGateway(String),

    /// Search call failed (network or backend fault). Per-event; never
    /// terminates the dispatcher.
    #[error("Search backend error: {0}")]
    SearchBackend(String),

    /// Archived record missing an expected field, or its timestamp does not
    /// parse. The dispatcher degrades this to the not-found reply.
    #[error("Malformed archive hit: {0}")]
    MalformedHit(String),

    #[error("Reply delivery failed: {0}")]
    ReplySend(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}
