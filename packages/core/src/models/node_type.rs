//! Built (validated, immutable) schema elements
//!
//! Node types reference each other through [`NodeTypeId`]s into the owning
//! [`Schema`](super::Schema) arena, so the whole graph of edges and reverse
//! edges is plain data with no reference cycles.

use super::leaf_type::LeafType;
use super::schema::Schema;
use std::collections::HashMap;

/// Index of a node type inside its schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeTypeId(pub(crate) usize);

impl NodeTypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A declared entity
#[derive(Debug, Clone)]
pub struct NodeType {
    pub(crate) id: NodeTypeId,
    pub(crate) name: String,
    pub(crate) plural: String,
    pub(crate) description: Option<String>,
    pub(crate) public: bool,
    pub(crate) immutable: bool,
    pub(crate) components: Vec<Component>,
    pub(crate) component_index: HashMap<String, usize>,
    pub(crate) unique_constraints: Vec<UniqueConstraint>,
    pub(crate) reverse_edges: Vec<ReverseEdge>,
    pub(crate) reverse_edge_index: HashMap<String, usize>,
    pub(crate) virtual_fields: Vec<VirtualField>,
}

impl NodeType {
    pub fn id(&self) -> NodeTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plural(&self) -> &str {
        &self.plural
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Components in declaration order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.component_index
            .get(name)
            .map(|&index| &self.components[index])
    }

    pub fn leaf(&self, name: &str) -> Option<&Leaf> {
        self.component(name).and_then(Component::as_leaf)
    }

    pub fn edge(&self, name: &str) -> Option<&Edge> {
        self.component(name).and_then(Component::as_edge)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.components.iter().filter_map(Component::as_leaf)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.components.iter().filter_map(Component::as_edge)
    }

    /// Unique constraints in declaration order
    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.unique_constraints
    }

    pub fn unique_constraint(&self, name: &str) -> Option<&UniqueConstraint> {
        self.unique_constraints.iter().find(|u| u.name == name)
    }

    /// The first unique constraint
    pub fn identifier(&self) -> &UniqueConstraint {
        // Non-emptiness is checked when the schema is built.
        &self.unique_constraints[0]
    }

    pub fn reverse_edges(&self) -> &[ReverseEdge] {
        &self.reverse_edges
    }

    pub fn reverse_edge(&self, name: &str) -> Option<&ReverseEdge> {
        self.reverse_edge_index
            .get(name)
            .map(|&index| &self.reverse_edges[index])
    }

    pub fn virtual_fields(&self) -> &[VirtualField] {
        &self.virtual_fields
    }

    pub fn virtual_field(&self, name: &str) -> Option<&VirtualField> {
        self.virtual_fields.iter().find(|v| v.name == name)
    }
}

/// Leaf or edge
#[derive(Debug, Clone)]
pub enum Component {
    Leaf(Leaf),
    Edge(Edge),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Component::Leaf(leaf) => &leaf.name,
            Component::Edge(edge) => &edge.name,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Component::Leaf(leaf) => leaf.nullable,
            Component::Edge(edge) => edge.nullable,
        }
    }

    pub fn is_immutable(&self) -> bool {
        match self {
            Component::Leaf(leaf) => leaf.immutable,
            Component::Edge(edge) => edge.immutable,
        }
    }

    pub fn is_public(&self) -> bool {
        match self {
            Component::Leaf(leaf) => leaf.public,
            Component::Edge(edge) => edge.public,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Component::Leaf(leaf) => Some(leaf),
            Component::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Component::Edge(edge) => Some(edge),
            Component::Leaf(_) => None,
        }
    }
}

/// Scalar / enum attribute
#[derive(Debug, Clone)]
pub struct Leaf {
    pub(crate) name: String,
    pub(crate) leaf_type: LeafType,
    pub(crate) description: Option<String>,
    pub(crate) nullable: bool,
    pub(crate) immutable: bool,
    pub(crate) public: bool,
}

impl Leaf {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn leaf_type(&self) -> &LeafType {
        &self.leaf_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn is_public(&self) -> bool {
        self.public
    }
}

/// To-one reference, stored as the value of one of the head's unique constraints
#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) name: String,
    pub(crate) tail: NodeTypeId,
    pub(crate) head: NodeTypeId,
    pub(crate) references: usize,
    pub(crate) description: Option<String>,
    pub(crate) nullable: bool,
    pub(crate) immutable: bool,
    pub(crate) public: bool,
}

impl Edge {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node type declaring the edge
    pub fn tail(&self) -> NodeTypeId {
        self.tail
    }

    /// Referenced node type
    pub fn head(&self) -> NodeTypeId {
        self.head
    }

    /// The head's unique constraint whose value the edge stores
    pub fn referenced_unique<'s>(&self, schema: &'s Schema) -> &'s UniqueConstraint {
        &schema.node_type(self.head).unique_constraints[self.references]
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn is_public(&self) -> bool {
        self.public
    }
}

/// Ordered set of components identifying at most one node
#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) node_type: NodeTypeId,
    pub(crate) components: Vec<String>,
    pub(crate) nullable: bool,
    pub(crate) immutable: bool,
    pub(crate) public: bool,
}

impl UniqueConstraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the node type's declaration order (0 = identifier)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_identifier(&self) -> bool {
        self.index == 0
    }

    pub fn node_type(&self) -> NodeTypeId {
        self.node_type
    }

    /// Component names in declaration order
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn contains(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }

    /// True only when every component is nullable; such a constraint is not usable
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn is_public(&self) -> bool {
        self.public
    }
}

/// Inverse side of an edge, observed from the edge's head
#[derive(Debug, Clone)]
pub struct ReverseEdge {
    pub(crate) name: String,
    pub(crate) node_type: NodeTypeId,
    pub(crate) referrer: NodeTypeId,
    pub(crate) original_edge: String,
    pub(crate) unique: bool,
    pub(crate) description: Option<String>,
}

impl ReverseEdge {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node type the reverse edge is declared on (the original edge's head)
    pub fn node_type(&self) -> NodeTypeId {
        self.node_type
    }

    /// Node type holding the original edge
    pub fn referrer(&self) -> NodeTypeId {
        self.referrer
    }

    pub fn original_edge_name(&self) -> &str {
        &self.original_edge
    }

    pub fn original_edge<'s>(&self, schema: &'s Schema) -> &'s Edge {
        schema
            .node_type(self.referrer)
            .edge(&self.original_edge)
            .expect("reverse edges are validated against their original edge at build time")
    }

    /// At most one referrer per node: the original edge alone forms a unique constraint
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Input-only field
#[derive(Debug, Clone)]
pub struct VirtualField {
    pub(crate) name: String,
    pub(crate) leaf_type: LeafType,
    pub(crate) nullable: bool,
    pub(crate) creation: bool,
    pub(crate) update: bool,
}

impl VirtualField {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn leaf_type(&self) -> &LeafType {
        &self.leaf_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn in_creation(&self) -> bool {
        self.creation
    }

    pub fn in_update(&self) -> bool {
        self.update
    }
}
