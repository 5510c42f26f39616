//! Infrastructure adapters. Implement outbound ports.
//!
//! Telegram and the search backend. Map errors to DomainError.

pub mod search;
pub mod telegram;
