//! Storage Layer
//!
//! The engine never touches storage itself. This module defines:
//!
//! - [`Connector`] - the pluggable backend the engine delegates persistence to
//! - [`NodeChange`] / [`ChangeBus`] - change notifications emitted by
//!   successful operations
//! - [`MemoryStore`] - an in-memory connector with a call log, used by tests
//!   and embedders that do not need durability

pub mod connector;
pub mod events;
mod memory_store;

pub use connector::{
    Connector, CountQuery, CreateStatement, DeleteStatement, FindQuery, UpdateStatement,
};
pub use events::{ChangeBus, ChangeListener, NodeChange};
pub use memory_store::{MemoryStore, StoreCall};
