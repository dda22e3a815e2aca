//! Schema construction
//!
//! [`Schema::new`] validates a [`SchemaDefinition`] and freezes it. Every check
//! that can be done without running an operation happens here, so that a
//! running engine never meets a half-valid schema:
//!
//! - names follow the naming rules and are unique in their scope
//! - every unique constraint is non-empty and references existing components
//! - the identifier (first unique constraint) is non-nullable and immutable
//! - edges target an existing node type and one of its non-nullable unique
//!   constraints, which must not contain the edge itself
//! - reverse edges point back at an edge whose head is the declaring node type

use super::definition::{ComponentDefinition, NodeTypeDefinition, SchemaDefinition};
use super::error::DefinitionError;
use super::node_type::{
    Component, Edge, Leaf, NodeType, NodeTypeId, ReverseEdge, UniqueConstraint, VirtualField,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// PascalCase node type names
static NODE_TYPE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap());

/// Field names: letters, digits and underscores, not starting with a digit
static FIELD_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[_a-zA-Z][_a-zA-Z0-9]*$").unwrap());

fn is_valid_node_type_name(name: &str) -> bool {
    NODE_TYPE_NAME_RE.is_match(name)
}

pub(crate) fn is_valid_field_name(name: &str) -> bool {
    FIELD_NAME_RE.is_match(name)
}

/// Immutable set of node types
#[derive(Debug, Clone)]
pub struct Schema {
    node_types: Vec<NodeType>,
    by_name: HashMap<String, NodeTypeId>,
}

impl Schema {
    /// Validate a definition and build the schema
    pub fn new(definition: SchemaDefinition) -> Result<Self, DefinitionError> {
        if definition.node_types.is_empty() {
            return Err(DefinitionError::empty("schema", "node_types"));
        }

        let mut by_name = HashMap::new();
        for (index, node_type) in definition.node_types.iter().enumerate() {
            if !is_valid_node_type_name(&node_type.name) {
                return Err(DefinitionError::invalid_name("schema", &node_type.name));
            }
            if by_name
                .insert(node_type.name.clone(), NodeTypeId(index))
                .is_some()
            {
                return Err(DefinitionError::duplicate("schema", &node_type.name));
            }
        }

        let mut node_types = definition
            .node_types
            .iter()
            .enumerate()
            .map(|(index, def)| build_components(NodeTypeId(index), def, &by_name))
            .collect::<Result<Vec<_>, _>>()?;

        for (node_type, def) in node_types.iter_mut().zip(&definition.node_types) {
            build_unique_constraints(node_type, def)?;
        }

        // Edges can only be resolved once every node type has its unique constraints.
        for (index, def) in definition.node_types.iter().enumerate() {
            resolve_edge_references(&mut node_types, NodeTypeId(index), def)?;
        }

        for (index, def) in definition.node_types.iter().enumerate() {
            let reverse_edges = build_reverse_edges(&node_types, NodeTypeId(index), def)?;
            let node_type = &mut node_types[index];
            node_type.reverse_edge_index = reverse_edges
                .iter()
                .enumerate()
                .map(|(i, r)| (r.name.clone(), i))
                .collect();
            node_type.reverse_edges = reverse_edges;
        }

        let schema = Self {
            node_types,
            by_name,
        };

        tracing::debug!(
            "Built schema with {} node type(s)",
            schema.node_types.len()
        );

        Ok(schema)
    }

    /// Get a node type by id
    ///
    /// Ids are only handed out by this schema, so they are always in range.
    pub fn node_type(&self, id: NodeTypeId) -> &NodeType {
        &self.node_types[id.0]
    }

    pub fn node_type_by_name(&self, name: &str) -> Option<&NodeType> {
        self.by_name.get(name).map(|&id| self.node_type(id))
    }

    /// Node types in declaration order
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.node_types.iter()
    }

    pub fn len(&self) -> usize {
        self.node_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_types.is_empty()
    }
}

fn build_components(
    id: NodeTypeId,
    def: &NodeTypeDefinition,
    by_name: &HashMap<String, NodeTypeId>,
) -> Result<NodeType, DefinitionError> {
    let path = def.name.as_str();

    if def.components.is_empty() {
        return Err(DefinitionError::empty(path, "components"));
    }

    let mut components = Vec::with_capacity(def.components.len());
    let mut component_index = HashMap::new();

    for component in &def.components {
        let name = component.name();
        let component_path = format!("{}.{}", path, name);
        if !is_valid_field_name(name) {
            return Err(DefinitionError::invalid_name(path, name));
        }
        if component_index
            .insert(name.to_string(), components.len())
            .is_some()
        {
            return Err(DefinitionError::duplicate(path, name));
        }

        components.push(match component {
            ComponentDefinition::Leaf(leaf) => Component::Leaf(Leaf {
                name: leaf.name.clone(),
                leaf_type: leaf.leaf_type.clone(),
                description: leaf.description.clone(),
                nullable: leaf.nullable,
                immutable: leaf.immutable || def.immutable,
                public: leaf.public,
            }),
            ComponentDefinition::Edge(edge) => {
                let head = by_name.get(&edge.head).copied().ok_or_else(|| {
                    DefinitionError::unknown(&component_path, "node type", &edge.head)
                })?;
                Component::Edge(Edge {
                    name: edge.name.clone(),
                    tail: id,
                    head,
                    // Resolved once every node type has its unique constraints.
                    references: 0,
                    description: edge.description.clone(),
                    nullable: edge.nullable,
                    immutable: edge.immutable || def.immutable,
                    public: edge.public,
                })
            }
        });
    }

    let mut virtual_fields = Vec::with_capacity(def.virtual_fields.len());
    for field in &def.virtual_fields {
        if !is_valid_field_name(&field.name) {
            return Err(DefinitionError::invalid_name(path, &field.name));
        }
        if component_index.contains_key(&field.name)
            || virtual_fields
                .iter()
                .any(|v: &VirtualField| v.name == field.name)
        {
            return Err(DefinitionError::duplicate(path, &field.name));
        }
        virtual_fields.push(VirtualField {
            name: field.name.clone(),
            leaf_type: field.leaf_type.clone(),
            nullable: field.nullable,
            creation: field.creation,
            update: field.update && !def.immutable,
        });
    }

    Ok(NodeType {
        id,
        name: def.name.clone(),
        plural: def
            .plural
            .clone()
            .unwrap_or_else(|| format!("{}s", def.name)),
        description: def.description.clone(),
        public: def.public,
        immutable: def.immutable,
        components,
        component_index,
        unique_constraints: Vec::new(),
        reverse_edges: Vec::new(),
        reverse_edge_index: HashMap::new(),
        virtual_fields,
    })
}

fn build_unique_constraints(
    node_type: &mut NodeType,
    def: &NodeTypeDefinition,
) -> Result<(), DefinitionError> {
    if def.unique.is_empty() {
        return Err(DefinitionError::empty(&def.name, "unique constraints"));
    }

    let mut constraints: Vec<UniqueConstraint> = Vec::with_capacity(def.unique.len());

    for (index, unique) in def.unique.iter().enumerate() {
        let path = format!("{}.unique[{}]", def.name, index);

        if unique.components.is_empty() {
            return Err(DefinitionError::empty(&path, "components"));
        }

        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(unique.components.len());
        for name in &unique.components {
            let component = node_type
                .component(name)
                .ok_or_else(|| DefinitionError::unknown(&path, "component", name))?;
            if !seen.insert(name.as_str()) {
                return Err(DefinitionError::duplicate(&path, name));
            }
            members.push(component);
        }

        let name = unique
            .name
            .clone()
            .unwrap_or_else(|| unique.components.join("_"));
        if !is_valid_field_name(&name) {
            return Err(DefinitionError::invalid_name(&path, &name));
        }
        if constraints.iter().any(|c| c.name == name) {
            return Err(DefinitionError::duplicate(&path, &name));
        }
        if constraints
            .iter()
            .any(|c| c.components == unique.components)
        {
            return Err(DefinitionError::invalid(
                &path,
                format!("same components as an earlier constraint ({})", name),
            ));
        }

        let constraint = UniqueConstraint {
            name,
            index,
            node_type: node_type.id,
            components: unique.components.clone(),
            nullable: members.iter().all(|c| c.is_nullable()),
            immutable: members.iter().all(|c| c.is_immutable()),
            public: members.iter().all(|c| c.is_public()),
        };

        if index == 0 {
            if let Some(nullable) = members.iter().find(|c| c.is_nullable()) {
                return Err(DefinitionError::invalid(
                    &path,
                    format!(
                        "the identifier cannot contain the nullable component \"{}\"",
                        nullable.name()
                    ),
                ));
            }
            if !constraint.immutable {
                return Err(DefinitionError::invalid(
                    &path,
                    "the identifier must be immutable",
                ));
            }
        }

        constraints.push(constraint);
    }

    node_type.unique_constraints = constraints;
    Ok(())
}

fn resolve_edge_references(
    node_types: &mut [NodeType],
    id: NodeTypeId,
    def: &NodeTypeDefinition,
) -> Result<(), DefinitionError> {
    for component in &def.components {
        let ComponentDefinition::Edge(edge_def) = component else {
            continue;
        };
        let path = format!("{}.{}", def.name, edge_def.name);

        let head = node_types[id.0]
            .edge(&edge_def.name)
            .map(|edge| edge.head)
            .ok_or_else(|| DefinitionError::unknown(&path, "edge", &edge_def.name))?;
        let head_type = &node_types[head.0];

        let references = match &edge_def.references {
            Some(name) => head_type
                .unique_constraint(name)
                .map(|u| u.index)
                .ok_or_else(|| DefinitionError::unknown(&path, "unique constraint", name))?,
            None => 0,
        };
        let unique = &head_type.unique_constraints[references];

        if unique.nullable {
            return Err(DefinitionError::invalid(
                &path,
                format!(
                    "cannot reference the nullable unique constraint \"{}.{}\"",
                    head_type.name, unique.name
                ),
            ));
        }
        if head == id && unique.contains(&edge_def.name) {
            return Err(DefinitionError::invalid(
                &path,
                format!(
                    "cannot reference \"{}.{}\" which contains the edge itself",
                    head_type.name, unique.name
                ),
            ));
        }

        if let Some(index) = node_types[id.0].component_index.get(&edge_def.name).copied() {
            if let Component::Edge(edge) = &mut node_types[id.0].components[index] {
                edge.references = references;
            }
        }
    }

    Ok(())
}

fn build_reverse_edges(
    node_types: &[NodeType],
    id: NodeTypeId,
    def: &NodeTypeDefinition,
) -> Result<Vec<ReverseEdge>, DefinitionError> {
    let node_type = &node_types[id.0];
    let mut reverse_edges: Vec<ReverseEdge> = Vec::with_capacity(def.reverse_edges.len());

    for reverse in &def.reverse_edges {
        let path = format!("{}.{}", def.name, reverse.name);

        if !is_valid_field_name(&reverse.name) {
            return Err(DefinitionError::invalid_name(&def.name, &reverse.name));
        }
        if node_type.component(&reverse.name).is_some()
            || node_type.virtual_field(&reverse.name).is_some()
            || reverse_edges.iter().any(|r| r.name == reverse.name)
        {
            return Err(DefinitionError::duplicate(&def.name, &reverse.name));
        }

        let (tail_name, edge_name) = reverse.original_edge.split_once('.').ok_or_else(|| {
            DefinitionError::invalid(
                &path,
                format!(
                    "original_edge \"{}\" must be written \"NodeType.edge\"",
                    reverse.original_edge
                ),
            )
        })?;

        let tail = node_types
            .iter()
            .find(|n| n.name == tail_name)
            .ok_or_else(|| DefinitionError::unknown(&path, "node type", tail_name))?;
        let edge = tail
            .edge(edge_name)
            .ok_or_else(|| DefinitionError::unknown(&path, "edge", &reverse.original_edge))?;

        if edge.head != id {
            return Err(DefinitionError::invalid(
                &path,
                format!(
                    "\"{}\" references \"{}\", not \"{}\"",
                    reverse.original_edge, node_types[edge.head.0].name, def.name
                ),
            ));
        }
        if reverse_edges
            .iter()
            .any(|r| r.referrer == tail.id && r.original_edge == edge_name)
        {
            return Err(DefinitionError::duplicate(&path, &reverse.original_edge));
        }

        let unique = tail
            .unique_constraints
            .iter()
            .any(|u| u.components.len() == 1 && u.components[0] == edge_name);

        reverse_edges.push(ReverseEdge {
            name: reverse.name.clone(),
            node_type: id,
            referrer: tail.id,
            original_edge: edge_name.to_string(),
            unique,
            description: reverse.description.clone(),
        });
    }

    Ok(reverse_edges)
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;
