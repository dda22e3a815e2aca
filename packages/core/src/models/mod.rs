//! Data Models
//!
//! This module contains the schema model and the value types that flow through
//! the engine:
//!
//! - `SchemaDefinition` - declarative, serde-friendly description of node types
//! - `Schema` / `NodeType` - the validated, frozen form of a definition
//! - `LeafType` - scalar / enum types with parsing and ordering rules
//! - `NodeValue`, `Selection`, `OrderBy` - records and their projection / sorting
//! - `UniqueValue` - a raw value matched against one unique constraint

mod definition;
mod error;
mod leaf_type;
mod node_type;
mod node_value;
mod schema;
mod unique_value;

pub use definition::{
    ComponentDefinition, EdgeDefinition, LeafDefinition, NodeTypeDefinition,
    ReverseEdgeDefinition, SchemaDefinition, UniqueDefinition, VirtualFieldDefinition,
};
pub use error::{join_path, DefinitionError, ValidationError};
pub(crate) use error::json_kind;
pub use leaf_type::LeafType;
pub use node_type::{
    Component, Edge, Leaf, NodeType, NodeTypeId, ReverseEdge, UniqueConstraint, VirtualField,
};
pub use node_value::{NodeValue, OrderBy, Selection, SortDirection};
pub use schema::Schema;
pub(crate) use schema::is_valid_field_name;
pub use unique_value::{resolve_unique, UniqueValue};
