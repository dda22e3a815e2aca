//! Declarative schema definitions (user input)
//!
//! These are the serde-friendly structures a schema is described with, usually
//! loaded from JSON. They are validated and turned into the immutable
//! [`Schema`](super::Schema) once, at startup.
//!
//! ## Example
//!
//! ```json
//! {
//!   "node_types": [
//!     {
//!       "name": "Category",
//!       "components": [
//!         { "kind": "leaf", "name": "_id", "type": "uuid", "immutable": true },
//!         { "kind": "edge", "name": "parent", "head": "Category", "nullable": true },
//!         { "kind": "leaf", "name": "slug", "type": "non_empty_string" }
//!       ],
//!       "unique": [
//!         { "components": ["_id"] },
//!         { "components": ["parent", "slug"] }
//!       ],
//!       "reverse_edges": [
//!         { "name": "children", "original_edge": "Category.parent" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use super::leaf_type::LeafType;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Complete schema definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub node_types: Vec<NodeTypeDefinition>,
}

/// Definition of one node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTypeDefinition {
    /// PascalCase name, unique in the schema
    pub name: String,

    /// Plural form, defaults to `name` + "s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the node type is exposed to the public query layer
    #[serde(default = "default_true")]
    pub public: bool,

    /// Immutable node types can be created and deleted but never updated
    #[serde(default)]
    pub immutable: bool,

    /// Ordered components; the order is kept for selections and shapes
    pub components: Vec<ComponentDefinition>,

    /// Unique constraints; the first one is the identifier
    pub unique: Vec<UniqueDefinition>,

    #[serde(default)]
    pub reverse_edges: Vec<ReverseEdgeDefinition>,

    /// Input-only fields, available to field resolvers but never persisted
    #[serde(default)]
    pub virtual_fields: Vec<VirtualFieldDefinition>,
}

/// Leaf or edge component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentDefinition {
    Leaf(LeafDefinition),
    Edge(EdgeDefinition),
}

impl ComponentDefinition {
    pub fn name(&self) -> &str {
        match self {
            ComponentDefinition::Leaf(leaf) => &leaf.name,
            ComponentDefinition::Edge(edge) => &edge.name,
        }
    }
}

/// Scalar / enum attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub leaf_type: LeafType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub immutable: bool,

    #[serde(default = "default_true")]
    pub public: bool,
}

/// Reference to another node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub name: String,

    /// Name of the referenced node type
    pub head: String,

    /// Name of the head's unique constraint the edge stores; defaults to its identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub immutable: bool,

    #[serde(default = "default_true")]
    pub public: bool,
}

/// Unique constraint over one or more components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueDefinition {
    /// Defaults to the component names joined with `_`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub components: Vec<String>,
}

/// Inverse side of an edge, declared on the edge's head
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseEdgeDefinition {
    pub name: String,

    /// `"<TailNodeType>.<edge>"`
    pub original_edge: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Input-only field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualFieldDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub leaf_type: LeafType,

    #[serde(default)]
    pub nullable: bool,

    /// Available in creation input
    #[serde(default = "default_true")]
    pub creation: bool,

    /// Available in update input
    #[serde(default)]
    pub update: bool,
}
