//! Application use cases. Orchestrate domain logic via ports.

pub mod access_policy;
pub mod dispatcher;
pub mod formatter;
pub mod query_builder;

pub use access_policy::AccessPolicy;
pub use dispatcher::EventDispatcher;
pub use query_builder::QueryBuilder;
