//! Client filter input
//!
//! Turns the JSON shape clients send into a [`Filter`]. An object is the AND of
//! its entries; each key is either a combinator (`AND`, `OR`, `NOT`) or a field
//! name with an optional operator suffix:
//!
//! | field kind              | keys                                                            |
//! |-------------------------|-----------------------------------------------------------------|
//! | leaf                    | `f`, `f_not`, `f_gt`, `f_gte`, `f_lt`, `f_lte`, `f_in`, `f_not_in`, `f_is_null` |
//! | edge                    | `f`, `f_not`, `f_is_null`                                       |
//! | unique reverse edge     | `f`, `f_not`, `f_is_null`                                       |
//! | non-unique reverse edge | `f_some`, `f_none`, `f_every`                                   |
//!
//! A key that is exactly a field name is never split. Leaf values are kept as
//! given; [`optimize`](super::optimize) parses and validates them.

use super::ast::{EdgeOperator, Filter, LeafOperator, ReverseEdgeOperator};
use super::error::FilterError;
use crate::models::{join_path, Component, NodeType, NodeValue, ReverseEdge, Schema};
use serde_json::Value;

// Longest first, so `_not_in` is tried before `_in` and `_not`.
const SUFFIXES: [&str; 11] = [
    "_is_null", "_not_in", "_every", "_none", "_some", "_gte", "_lte", "_not", "_gt", "_lt", "_in",
];

/// Parse a client filter scoped to `node_type`; `null` means no filter
pub fn parse_filter(
    schema: &Schema,
    node_type: &NodeType,
    input: &Value,
) -> Result<Filter, FilterError> {
    parse_at(schema, node_type, input, "where")
}

fn parse_at(
    schema: &Schema,
    node_type: &NodeType,
    input: &Value,
    path: &str,
) -> Result<Filter, FilterError> {
    let object = match input {
        Value::Null => return Ok(Filter::TRUE),
        Value::Object(object) => object,
        _ => return Err(FilterError::invalid_input(path, "expected an object")),
    };

    let mut operands = Vec::with_capacity(object.len());
    for (key, value) in object {
        let entry_path = join_path(path, key);
        let operand = match key.as_str() {
            "AND" | "OR" => {
                let items = match value {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| {
                            parse_at(schema, node_type, item, &format!("{}[{}]", entry_path, index))
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => return Err(FilterError::invalid_input(entry_path, "expected a list")),
                };
                if key == "AND" {
                    Filter::And(items)
                } else {
                    Filter::Or(items)
                }
            }
            "NOT" => match value {
                // An absent negation constrains nothing
                Value::Null => Filter::TRUE,
                value => parse_at(schema, node_type, value, &entry_path)?.negate(),
            },
            _ => parse_entry(schema, node_type, key, value, &entry_path)?,
        };
        operands.push(operand);
    }

    Ok(match operands.len() {
        1 => operands.remove(0),
        _ => Filter::And(operands),
    })
}

fn is_field(node_type: &NodeType, name: &str) -> bool {
    node_type.component(name).is_some() || node_type.reverse_edge(name).is_some()
}

fn parse_entry(
    schema: &Schema,
    node_type: &NodeType,
    key: &str,
    value: &Value,
    path: &str,
) -> Result<Filter, FilterError> {
    if is_field(node_type, key) {
        return parse_field(schema, node_type, key, "", value, path);
    }
    for suffix in SUFFIXES {
        if let Some(name) = key.strip_suffix(suffix) {
            if is_field(node_type, name) {
                return parse_field(schema, node_type, name, suffix, value, path);
            }
        }
    }
    Err(FilterError::unknown_field(node_type.name(), key))
}

fn expect_bool(value: &Value, path: &str) -> Result<bool, FilterError> {
    value
        .as_bool()
        .ok_or_else(|| FilterError::invalid_input(path, "expected a boolean"))
}

fn parse_field(
    schema: &Schema,
    node_type: &NodeType,
    name: &str,
    suffix: &str,
    value: &Value,
    path: &str,
) -> Result<Filter, FilterError> {
    let invalid_operator = || {
        FilterError::invalid_operator(node_type.name(), name, suffix.trim_start_matches('_'))
    };

    if let Some(reverse_edge) = node_type.reverse_edge(name) {
        return parse_reverse_edge(schema, node_type, reverse_edge, suffix, value, path);
    }

    match node_type.component(name) {
        Some(Component::Leaf(_)) => {
            let operator = match suffix {
                "" => LeafOperator::Eq,
                "_not" => LeafOperator::Not,
                "_gt" => LeafOperator::Gt,
                "_gte" => LeafOperator::Gte,
                "_lt" => LeafOperator::Lt,
                "_lte" => LeafOperator::Lte,
                "_in" => LeafOperator::In,
                "_not_in" => LeafOperator::NotIn,
                "_is_null" => {
                    let is_null = Filter::eq(name, Value::Null);
                    return Ok(if expect_bool(value, path)? {
                        is_null
                    } else {
                        is_null.negate()
                    });
                }
                _ => return Err(invalid_operator()),
            };
            Ok(Filter::leaf(name, operator, value.clone()))
        }
        Some(Component::Edge(edge)) => {
            let head = schema.node_type(edge.head());
            let exists = Filter::edge(name, EdgeOperator::Eq, Filter::TRUE);
            match (suffix, value) {
                ("", Value::Null) => Ok(exists.negate()),
                ("_not", Value::Null) => Ok(exists),
                ("", value) => Ok(Filter::edge(
                    name,
                    EdgeOperator::Eq,
                    parse_at(schema, head, value, path)?,
                )),
                ("_not", value) => Ok(Filter::edge(
                    name,
                    EdgeOperator::Not,
                    parse_at(schema, head, value, path)?,
                )),
                ("_is_null", value) => Ok(if expect_bool(value, path)? {
                    exists.negate()
                } else {
                    exists
                }),
                _ => Err(invalid_operator()),
            }
        }
        None => Err(FilterError::unknown_field(node_type.name(), name)),
    }
}

fn parse_reverse_edge(
    schema: &Schema,
    node_type: &NodeType,
    reverse_edge: &ReverseEdge,
    suffix: &str,
    value: &Value,
    path: &str,
) -> Result<Filter, FilterError> {
    let name = reverse_edge.name();
    let referrer = schema.node_type(reverse_edge.referrer());
    let invalid_operator = || {
        FilterError::invalid_operator(node_type.name(), name, suffix.trim_start_matches('_'))
    };

    if reverse_edge.is_unique() {
        let exists = Filter::reverse_edge(name, ReverseEdgeOperator::Eq, Filter::TRUE);
        return match (suffix, value) {
            ("", Value::Null) => Ok(exists.negate()),
            ("_not", Value::Null) => Ok(exists),
            ("", value) => Ok(Filter::reverse_edge(
                name,
                ReverseEdgeOperator::Eq,
                parse_at(schema, referrer, value, path)?,
            )),
            ("_not", value) => Ok(Filter::reverse_edge(
                name,
                ReverseEdgeOperator::Not,
                parse_at(schema, referrer, value, path)?,
            )),
            ("_is_null", value) => Ok(if expect_bool(value, path)? {
                exists.negate()
            } else {
                exists
            }),
            _ => Err(invalid_operator()),
        };
    }

    let operator = match suffix {
        "_some" => ReverseEdgeOperator::Some,
        "_none" => ReverseEdgeOperator::None,
        "_every" => ReverseEdgeOperator::Every,
        _ => return Err(invalid_operator()),
    };
    Ok(Filter::reverse_edge(
        name,
        operator,
        parse_at(schema, referrer, value, path)?,
    ))
}

/// Conjunction of equalities for a record-shaped value
///
/// Used for unique values and stored edge references: leaves compare with
/// `eq`, edges recurse into their head, and a `null` edge means "no node".
pub fn equality_filter(
    schema: &Schema,
    node_type: &NodeType,
    value: &NodeValue,
) -> Result<Filter, FilterError> {
    let mut operands = Vec::with_capacity(value.len());
    for (name, component_value) in value {
        let operand = match node_type.component(name) {
            Some(Component::Leaf(_)) => Filter::eq(name.as_str(), component_value.clone()),
            Some(Component::Edge(edge)) => match component_value {
                Value::Null => Filter::edge(name.as_str(), EdgeOperator::Eq, Filter::TRUE).negate(),
                Value::Object(nested) => Filter::edge(
                    name.as_str(),
                    EdgeOperator::Eq,
                    equality_filter(schema, schema.node_type(edge.head()), nested)?,
                ),
                _ => {
                    return Err(FilterError::invalid_value(
                        node_type.name(),
                        name.as_str(),
                        "expected an object or null",
                    ))
                }
            },
            None => return Err(FilterError::unknown_field(node_type.name(), name.as_str())),
        };
        operands.push(operand);
    }
    Ok(Filter::And(operands))
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod parser_test;
