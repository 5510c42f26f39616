//! tg-recall: Telegram bot that answers a message with the origin of the
//! most similar archived message.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
