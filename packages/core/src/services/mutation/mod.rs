//! Mutation Pipeline
//!
//! Turns client creation / update input into a connector payload:
//!
//! 1. [`FieldGraph`] orders a node type's writable fields by their declared
//!    dependencies, once, when the service is built
//! 2. [`parse_mutation`] resolves and parses every field concurrently, each
//!    field waiting only on the fields it depends on
//! 3. reverse-edge actions are parsed with the payload and applied once the
//!    node itself is persisted (see [`reverse_edge`])

mod field_graph;
mod pipeline;
pub(crate) mod reverse_edge;

pub use field_graph::MutationKind;
pub(crate) use field_graph::{FieldGraph, FieldKind};
pub(crate) use pipeline::{parse_mutation, ParsedMutation};
