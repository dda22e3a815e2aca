//! Unique-constraint resolution
//!
//! Clients identify a single node with an object holding the values of one of
//! its unique constraints, e.g. `{"_id": "..."}` or
//! `{"parent": {"id": 3}, "slug": "news"}`. [`resolve_unique`] finds which
//! constraint such an object satisfies.
//!
//! Constraints are tried strictly in declaration order, so the identifier
//! always wins when its components are present. A constraint is satisfied when
//! every one of its components is present (nullable ones may be `null`) and at
//! least one of them is non-null. Keys that belong to no tried constraint are
//! ignored.

use super::error::{join_path, ValidationError};
use super::node_type::{Component, NodeType, NodeTypeId, UniqueConstraint};
use super::node_value::NodeValue;
use super::schema::Schema;
use serde_json::Value;

/// A value matched against exactly one unique constraint
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueValue {
    node_type: NodeTypeId,
    constraint: usize,
    value: NodeValue,
}

impl UniqueValue {
    pub fn node_type(&self) -> NodeTypeId {
        self.node_type
    }

    /// Index of the matched constraint in the node type's declaration order
    pub fn constraint_index(&self) -> usize {
        self.constraint
    }

    pub fn constraint<'s>(&self, schema: &'s Schema) -> &'s UniqueConstraint {
        &schema.node_type(self.node_type).unique_constraints()[self.constraint]
    }

    /// The parsed component values; edge components hold nested unique values
    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn into_value(self) -> NodeValue {
        self.value
    }
}

/// Resolve `raw` against the node type's unique constraints
///
/// `candidates` restricts the search to the given constraint indexes (still in
/// declaration order); `None` tries them all.
///
/// # Errors
///
/// - `NotAnObject` when `raw` is not an object
/// - `Invalid` when a present component value has the wrong type
/// - `UniqueValueNotFound` when no candidate constraint is satisfied
pub fn resolve_unique(
    schema: &Schema,
    node_type: &NodeType,
    raw: &Value,
    candidates: Option<&[usize]>,
    path: &str,
) -> Result<UniqueValue, ValidationError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ValidationError::not_an_object(path, raw))?;

    let constraints = node_type.unique_constraints();
    let mut indexes: Vec<usize> = match candidates {
        Some(candidates) => candidates
            .iter()
            .copied()
            .filter(|&index| index < constraints.len())
            .collect(),
        None => (0..constraints.len()).collect(),
    };
    indexes.sort_unstable();
    indexes.dedup();

    for index in indexes {
        if let Some(value) = extract(schema, node_type, &constraints[index], object, path)? {
            return Ok(UniqueValue {
                node_type: node_type.id(),
                constraint: index,
                value,
            });
        }
    }

    Err(ValidationError::unique_value_not_found(
        path,
        node_type.name(),
    ))
}

// Ok(None) means "not satisfied, try the next constraint".
fn extract(
    schema: &Schema,
    node_type: &NodeType,
    constraint: &UniqueConstraint,
    object: &NodeValue,
    path: &str,
) -> Result<Option<NodeValue>, ValidationError> {
    let mut value = NodeValue::new();
    let mut has_non_null = false;

    for name in constraint.components() {
        let Some(component) = node_type.component(name) else {
            return Ok(None);
        };
        let Some(raw) = object.get(name) else {
            return Ok(None);
        };
        let component_path = join_path(path, name);

        if raw.is_null() {
            if !component.is_nullable() {
                return Ok(None);
            }
            value.insert(name.clone(), Value::Null);
            continue;
        }

        match component {
            Component::Leaf(leaf) => {
                let parsed = leaf
                    .leaf_type()
                    .parse(raw)
                    .map_err(|message| ValidationError::invalid(&component_path, message))?;
                value.insert(name.clone(), parsed);
            }
            Component::Edge(edge) => {
                let head = schema.node_type(edge.head());
                match resolve_unique(schema, head, raw, None, &component_path) {
                    Ok(nested) => {
                        value.insert(name.clone(), Value::Object(nested.into_value()));
                    }
                    Err(ValidationError::UniqueValueNotFound { .. }) => return Ok(None),
                    Err(err) => return Err(err),
                }
            }
        }
        has_non_null = true;
    }

    Ok(has_non_null.then_some(value))
}

#[cfg(test)]
#[path = "unique_value_test.rs"]
mod unique_value_test;
