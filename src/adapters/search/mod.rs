//! Search adapter module. Implements SearchGateway for the message archive.

pub mod es_client;

pub use es_client::EsSearchGateway;
