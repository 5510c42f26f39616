//! Telegram adapter module. Implements ChatGateway over grammers.
//!
//! Also carries the session storage helpers and the sign-in flows shared
//! with the session utility.

pub mod auth;
pub mod client;
pub mod mapper;
pub mod session;

pub use client::GrammersChatGateway;
