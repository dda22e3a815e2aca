//! Input shapes
//!
//! Serializable descriptors of the inputs a node type accepts, for a
//! query-protocol layer to expose. Only public node types, components and
//! reverse edges appear. Shapes refer to each other by name:
//!
//! | shape                    | accepted by |
//! |--------------------------|-------------|
//! | `<Type>WhereInput`       | `where` of `find_many`, `count`, `update_many`, `delete_many` |
//! | `<Type>WhereUniqueInput` | `where` of `get_one`, `update_one`, `delete_one`, `upsert` |
//! | `<Type>CreationInput`    | `data` of `create_one` / `create_many` |
//! | `<Type>UpdateInput`      | `data` of `update_one` / `update_many` |
//!
//! Edge and reverse-edge fields of the mutation shapes carry their nested
//! action object inline.

use super::mutation::{FieldGraph, FieldKind, MutationKind};
use crate::models::{Component, NodeType, ReverseEdge, Schema};
use serde::Serialize;

/// A named input object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputObjectShape {
    pub name: String,
    pub fields: Vec<InputFieldShape>,
}

impl InputObjectShape {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    fn push(&mut self, name: impl Into<String>, input_type: InputType, required: bool) {
        self.fields.push(InputFieldShape {
            name: name.into(),
            input_type,
            required,
        });
    }

    pub fn field(&self, name: &str) -> Option<&InputFieldShape> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputFieldShape {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputType {
    /// A value of the named leaf type
    Scalar { leaf_type: String },
    Boolean,
    /// Reference to a named shape
    Object { name: String },
    List { of: Box<InputType> },
    /// Nested action object, declared inline
    Actions { shape: InputObjectShape },
}

impl InputType {
    fn scalar(leaf_type: &str) -> Self {
        InputType::Scalar {
            leaf_type: leaf_type.to_string(),
        }
    }

    fn object(name: impl Into<String>) -> Self {
        InputType::Object { name: name.into() }
    }

    fn list(self) -> Self {
        InputType::List { of: Box::new(self) }
    }
}

pub fn where_input_name(node_type: &NodeType) -> String {
    format!("{}WhereInput", node_type.name())
}

pub fn where_unique_input_name(node_type: &NodeType) -> String {
    format!("{}WhereUniqueInput", node_type.name())
}

pub fn mutation_input_name(node_type: &NodeType, kind: MutationKind) -> String {
    match kind {
        MutationKind::Creation => format!("{}CreationInput", node_type.name()),
        MutationKind::Update => format!("{}UpdateInput", node_type.name()),
    }
}

/// Filter input of a node type
pub fn where_input_shape(schema: &Schema, node_type: &NodeType) -> InputObjectShape {
    let own = where_input_name(node_type);
    let mut shape = InputObjectShape::new(own.clone());

    shape.push("AND", InputType::object(own.clone()).list(), false);
    shape.push("OR", InputType::object(own.clone()).list(), false);
    shape.push("NOT", InputType::object(own), false);

    for component in node_type.components().iter().filter(|c| c.is_public()) {
        let name = component.name();
        match component {
            Component::Leaf(leaf) => {
                let scalar = InputType::scalar(leaf.leaf_type().name());
                shape.push(name, scalar.clone(), false);
                shape.push(format!("{}_not", name), scalar.clone(), false);
                if leaf.leaf_type().is_orderable() {
                    for suffix in ["gt", "gte", "lt", "lte"] {
                        shape.push(format!("{}_{}", name, suffix), scalar.clone(), false);
                    }
                }
                shape.push(format!("{}_in", name), scalar.clone().list(), false);
                shape.push(format!("{}_not_in", name), scalar.list(), false);
                shape.push(format!("{}_is_null", name), InputType::Boolean, false);
            }
            Component::Edge(edge) => {
                let head = InputType::object(where_input_name(schema.node_type(edge.head())));
                shape.push(name, head.clone(), false);
                shape.push(format!("{}_not", name), head, false);
                shape.push(format!("{}_is_null", name), InputType::Boolean, false);
            }
        }
    }

    for reverse_edge in public_reverse_edges(schema, node_type) {
        let name = reverse_edge.name();
        let referrer =
            InputType::object(where_input_name(schema.node_type(reverse_edge.referrer())));
        if reverse_edge.is_unique() {
            shape.push(name, referrer.clone(), false);
            shape.push(format!("{}_not", name), referrer, false);
            shape.push(format!("{}_is_null", name), InputType::Boolean, false);
        } else {
            for suffix in ["some", "none", "every"] {
                shape.push(format!("{}_{}", name, suffix), referrer.clone(), false);
            }
        }
    }

    shape
}

/// Unique-identity input of a node type
///
/// Lists the components of every public unique constraint, each optional: a
/// value must complete at least one constraint. Edge components take a unique
/// value of their head.
pub fn where_unique_input_shape(schema: &Schema, node_type: &NodeType) -> InputObjectShape {
    let mut shape = InputObjectShape::new(where_unique_input_name(node_type));

    for constraint in node_type
        .unique_constraints()
        .iter()
        .filter(|constraint| constraint.is_public())
    {
        for name in constraint.components() {
            if shape.field(name).is_some() {
                continue;
            }
            let input_type = match node_type.component(name) {
                Some(Component::Leaf(leaf)) => InputType::scalar(leaf.leaf_type().name()),
                Some(Component::Edge(edge)) => {
                    InputType::object(where_unique_input_name(schema.node_type(edge.head())))
                }
                None => continue,
            };
            shape.push(name.as_str(), input_type, false);
        }
    }

    shape
}

/// Creation or update input of a node type, from its field graph
pub(crate) fn mutation_input_shape(
    schema: &Schema,
    node_type: &NodeType,
    graph: &FieldGraph,
) -> InputObjectShape {
    let kind = graph.kind();
    let mut shape = InputObjectShape::new(mutation_input_name(node_type, kind));

    for field in graph.fields() {
        let name = field.name.as_str();
        let resolved = field.resolver.is_some();

        match field.kind {
            FieldKind::Leaf | FieldKind::Edge => {
                let Some(component) = node_type.component(name) else {
                    continue;
                };
                if !component.is_public() {
                    continue;
                }
                let required =
                    kind == MutationKind::Creation && !component.is_nullable() && !resolved;
                let input_type = match component {
                    Component::Leaf(leaf) => InputType::scalar(leaf.leaf_type().name()),
                    Component::Edge(edge) => {
                        let head = schema.node_type(edge.head());
                        let mut actions = InputObjectShape::new(format!(
                            "{}{}{}",
                            node_type.name(),
                            pascal_case(name),
                            kind_suffix(kind)
                        ));
                        actions.push("connect", InputType::object(where_unique_input_name(head)), false);
                        if edge.is_nullable() {
                            actions.push(
                                "connectIfExists",
                                InputType::object(where_unique_input_name(head)),
                                false,
                            );
                        }
                        actions.push(
                            "create",
                            InputType::object(mutation_input_name(head, MutationKind::Creation)),
                            false,
                        );
                        InputType::Actions { shape: actions }
                    }
                };
                shape.push(name, input_type, required);
            }
            FieldKind::Virtual => {
                if let Some(virtual_field) = node_type.virtual_field(name) {
                    let required =
                        kind == MutationKind::Creation && !virtual_field.is_nullable() && !resolved;
                    shape.push(name, InputType::scalar(virtual_field.leaf_type().name()), required);
                }
            }
            FieldKind::ReverseEdge => {
                let Some(reverse_edge) = public_reverse_edges(schema, node_type)
                    .find(|reverse_edge| reverse_edge.name() == name)
                else {
                    continue;
                };
                let actions = reverse_edge_actions(schema, node_type, reverse_edge, kind);
                if !actions.fields.is_empty() {
                    shape.push(name, InputType::Actions { shape: actions }, false);
                }
            }
        }
    }

    shape
}

fn reverse_edge_actions(
    schema: &Schema,
    node_type: &NodeType,
    reverse_edge: &ReverseEdge,
    kind: MutationKind,
) -> InputObjectShape {
    let referrer = schema.node_type(reverse_edge.referrer());
    let edge = reverse_edge.original_edge(schema);
    let mut shape = InputObjectShape::new(format!(
        "{}{}{}",
        node_type.name(),
        pascal_case(reverse_edge.name()),
        kind_suffix(kind)
    ));

    let unique = InputType::object(where_unique_input_name(referrer));
    let filter = InputType::object(where_input_name(referrer));
    let creation = InputType::object(mutation_input_name(referrer, MutationKind::Creation));
    let update = kind == MutationKind::Update;
    let connectable = !edge.is_immutable();
    let disconnectable = edge.is_nullable() && !edge.is_immutable();

    if reverse_edge.is_unique() {
        if update {
            shape.push("delete", InputType::Boolean, false);
            if disconnectable {
                shape.push("disconnect", InputType::Boolean, false);
            }
        }
        if connectable {
            shape.push("connect", unique, false);
        }
        shape.push("create", creation, false);
    } else {
        if update {
            shape.push("delete", unique.clone().list(), false);
            shape.push("deleteMany", filter.clone().list(), false);
            if disconnectable {
                shape.push("disconnect", unique.clone().list(), false);
                shape.push("disconnectMany", filter.clone().list(), false);
            }
        }
        if connectable {
            shape.push("connect", unique.list(), false);
            shape.push("connectMany", filter.list(), false);
        }
        shape.push("create", creation.list(), false);
    }

    shape
}

/// Reverse edges whose referrer and original edge are public
fn public_reverse_edges<'s>(
    schema: &'s Schema,
    node_type: &'s NodeType,
) -> impl Iterator<Item = &'s ReverseEdge> {
    node_type.reverse_edges().iter().filter(move |reverse_edge| {
        schema.node_type(reverse_edge.referrer()).is_public()
            && reverse_edge.original_edge(schema).is_public()
    })
}

fn kind_suffix(kind: MutationKind) -> &'static str {
    match kind {
        MutationKind::Creation => "CreationInput",
        MutationKind::Update => "UpdateInput",
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "input_shape_test.rs"]
mod input_shape_test;
