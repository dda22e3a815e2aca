//! NodeGraph Core - Schema-Driven Data Access
//!
//! This crate turns a declarative schema of node types into a typed data-access
//! engine over a pluggable storage backend.
//!
//! # Architecture
//!
//! - **Schema model**: node types with leaves, edges, unique constraints,
//!   reverse edges and virtual fields, validated once at construction
//! - **Filters**: a client filter shape parsed into a tree, then optimized into
//!   a canonical form connectors can rely on
//! - **Mutation pipeline**: creation / update payloads resolved field by field
//!   in dependency order, with nested edge and reverse-edge actions
//! - **Operations**: thirteen read / write operations with authorization
//!   filters, connector lifecycle hooks and change notifications
//!
//! # Modules
//!
//! - [`models`] - Schema model, leaf types, records and unique values
//! - [`filter`] - Filter tree, client-shape parser and optimizer
//! - [`services`] - `NodeService`, hooks and input shapes
//! - [`operations`] - Operation arguments, contexts and the bound API
//! - [`db`] - `Connector` trait, change events and the in-memory connector
//! - [`config`] - Engine configuration and tracing setup
//! - [`utils`] - Helpers for field resolvers

pub mod config;
pub mod db;
pub mod filter;
pub mod models;
pub mod operations;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::EngineConfig;
pub use db::{ChangeBus, Connector, MemoryStore, NodeChange};
pub use filter::{optimize, parse_filter, Filter, FilterError};
pub use models::*;
pub use operations::*;
pub use services::*;
