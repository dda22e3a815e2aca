//! Filter optimizer
//!
//! Rewrites a filter into a canonical, minimal form and validates it against
//! the node type it is scoped to. One pass rewrites children before their
//! parent; passes are repeated until nothing changes, so the result is a fixed
//! point and `optimize(optimize(x)) == optimize(x)`.
//!
//! Canonical form:
//!
//! - `AND`/`OR` are flattened, deduplicated, free of boolean operands and of
//!   complementary pairs (`x`, `NOT x`), with at least two operands
//! - negations never wrap a boolean or another negation
//! - leaf comparisons use `eq`, `in` (two or more values) and the ordering
//!   operators only; `not` / `not_in` become `NOT(eq)` / `NOT(in)`
//! - leaf values are parsed and normalized by the leaf type
//! - edges use `eq` only (`edge not f` is `edge eq NOT f`)
//! - unique reverse edges use `eq` only, the others `some` only
//!   (`none f` is `NOT(some f)`, `every f` is `NOT(some NOT f)`)

use super::ast::{
    EdgeComparison, EdgeOperator, Filter, LeafComparison, LeafOperator, ReverseEdgeComparison,
    ReverseEdgeOperator,
};
use super::error::FilterError;
use crate::models::{Leaf, NodeType, Schema};
use serde_json::Value;

// Every rule shrinks the tree or moves it closer to the canonical form, so a
// handful of passes reach the fixed point.
const MAX_PASSES: usize = 64;

/// Optimize a filter scoped to `node_type`
///
/// # Errors
///
/// Unknown leaf / edge / reverse-edge names, operators that do not apply to
/// the field, and values rejected by the leaf type.
pub fn optimize(
    schema: &Schema,
    node_type: &NodeType,
    filter: &Filter,
) -> Result<Filter, FilterError> {
    let mut current = optimize_once(schema, node_type, filter)?;
    for _ in 0..MAX_PASSES {
        let next = optimize_once(schema, node_type, &current)?;
        if next == current {
            break;
        }
        current = next;
    }
    Ok(current)
}

fn optimize_once(
    schema: &Schema,
    node_type: &NodeType,
    filter: &Filter,
) -> Result<Filter, FilterError> {
    match filter {
        Filter::Boolean(value) => Ok(Filter::Boolean(*value)),
        Filter::And(operands) => {
            let operands = operands
                .iter()
                .map(|operand| optimize_once(schema, node_type, operand))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(combine(operands, true))
        }
        Filter::Or(operands) => {
            let operands = operands
                .iter()
                .map(|operand| optimize_once(schema, node_type, operand))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(combine(operands, false))
        }
        Filter::Not(operand) => Ok(optimize_once(schema, node_type, operand)?.negate()),
        Filter::Leaf(comparison) => optimize_leaf(node_type, comparison),
        Filter::Edge(comparison) => optimize_edge(schema, node_type, comparison),
        Filter::ReverseEdge(comparison) => optimize_reverse_edge(schema, node_type, comparison),
    }
}

/// AND (`conjunction == true`) or OR of already optimized operands
fn combine(operands: Vec<Filter>, conjunction: bool) -> Filter {
    // true for AND, false for OR
    let identity = conjunction;

    let mut flattened = Vec::with_capacity(operands.len());
    for operand in operands {
        match operand {
            Filter::And(children) if conjunction => flattened.extend(children),
            Filter::Or(children) if !conjunction => flattened.extend(children),
            other => flattened.push(other),
        }
    }

    let mut kept: Vec<Filter> = Vec::with_capacity(flattened.len());
    for operand in flattened {
        match operand {
            Filter::Boolean(value) if value == identity => {}
            Filter::Boolean(_) => return Filter::Boolean(!identity),
            other => {
                if !kept.contains(&other) {
                    kept.push(other);
                }
            }
        }
    }

    let has_complement = kept.iter().any(|operand| match operand {
        Filter::Not(inner) => kept.contains(inner),
        _ => false,
    });
    if has_complement {
        return Filter::Boolean(!identity);
    }

    match kept.len() {
        0 => Filter::Boolean(identity),
        1 => kept.remove(0),
        _ if conjunction => Filter::And(kept),
        _ => Filter::Or(kept),
    }
}

fn parse_leaf_value(node_type: &NodeType, leaf: &Leaf, value: &Value) -> Result<Value, FilterError> {
    leaf.leaf_type()
        .parse(value)
        .map_err(|message| FilterError::invalid_value(node_type.name(), leaf.name(), message))
}

fn optimize_leaf(node_type: &NodeType, comparison: &LeafComparison) -> Result<Filter, FilterError> {
    let leaf = node_type
        .leaf(&comparison.leaf)
        .ok_or_else(|| FilterError::unknown_leaf(node_type.name(), &comparison.leaf))?;
    let value = &comparison.value;

    match comparison.operator {
        LeafOperator::Eq => leaf_equality(node_type, leaf, value),
        LeafOperator::Not => Ok(leaf_equality(node_type, leaf, value)?.negate()),
        LeafOperator::In => leaf_membership(node_type, leaf, value),
        LeafOperator::NotIn => Ok(leaf_membership(node_type, leaf, value)?.negate()),
        operator => {
            if !leaf.leaf_type().is_orderable() {
                return Err(FilterError::invalid_operator(
                    node_type.name(),
                    leaf.name(),
                    operator.as_str(),
                ));
            }
            // Nothing is ordered against null
            if value.is_null() {
                return Ok(Filter::FALSE);
            }
            let value = parse_leaf_value(node_type, leaf, value)?;
            Ok(Filter::leaf(leaf.name(), operator, value))
        }
    }
}

fn leaf_equality(node_type: &NodeType, leaf: &Leaf, value: &Value) -> Result<Filter, FilterError> {
    if value.is_null() {
        return Ok(if leaf.is_nullable() {
            Filter::eq(leaf.name(), Value::Null)
        } else {
            Filter::FALSE
        });
    }
    let value = parse_leaf_value(node_type, leaf, value)?;
    Ok(Filter::eq(leaf.name(), value))
}

fn leaf_membership(node_type: &NodeType, leaf: &Leaf, value: &Value) -> Result<Filter, FilterError> {
    let items = value.as_array().ok_or_else(|| {
        FilterError::invalid_value(node_type.name(), leaf.name(), "expected a list of values")
    })?;

    let mut values: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        let parsed = if item.is_null() {
            if !leaf.is_nullable() {
                continue;
            }
            Value::Null
        } else {
            parse_leaf_value(node_type, leaf, item)?
        };
        if !values.contains(&parsed) {
            values.push(parsed);
        }
    }

    Ok(match values.len() {
        0 => Filter::FALSE,
        1 => Filter::eq(leaf.name(), values.remove(0)),
        _ => Filter::leaf(leaf.name(), LeafOperator::In, Value::Array(values)),
    })
}

fn optimize_edge(
    schema: &Schema,
    node_type: &NodeType,
    comparison: &EdgeComparison,
) -> Result<Filter, FilterError> {
    let edge = node_type
        .edge(&comparison.edge)
        .ok_or_else(|| FilterError::unknown_edge(node_type.name(), &comparison.edge))?;
    let head = schema.node_type(edge.head());

    let inner = optimize_once(schema, head, &comparison.filter)?;
    let inner = match comparison.operator {
        EdgeOperator::Eq => inner,
        EdgeOperator::Not => inner.negate(),
    };

    Ok(match inner {
        Filter::Boolean(false) => Filter::FALSE,
        // A non-nullable edge always points at a node
        Filter::Boolean(true) if !edge.is_nullable() => Filter::TRUE,
        inner => Filter::edge(edge.name(), EdgeOperator::Eq, inner),
    })
}

fn optimize_reverse_edge(
    schema: &Schema,
    node_type: &NodeType,
    comparison: &ReverseEdgeComparison,
) -> Result<Filter, FilterError> {
    let reverse_edge = node_type
        .reverse_edge(&comparison.reverse_edge)
        .ok_or_else(|| {
            FilterError::unknown_reverse_edge(node_type.name(), &comparison.reverse_edge)
        })?;

    if reverse_edge.is_unique() != comparison.operator.is_unique() {
        return Err(FilterError::invalid_operator(
            node_type.name(),
            reverse_edge.name(),
            comparison.operator.as_str(),
        ));
    }

    let referrer = schema.node_type(reverse_edge.referrer());
    let inner = optimize_once(schema, referrer, &comparison.filter)?;
    let name = reverse_edge.name();

    let some = |inner: Filter| match inner {
        Filter::Boolean(false) => Filter::FALSE,
        inner => Filter::reverse_edge(name, ReverseEdgeOperator::Some, inner),
    };

    Ok(match comparison.operator {
        ReverseEdgeOperator::Eq | ReverseEdgeOperator::Not => {
            let inner = if comparison.operator == ReverseEdgeOperator::Not {
                inner.negate()
            } else {
                inner
            };
            match inner {
                Filter::Boolean(false) => Filter::FALSE,
                inner => Filter::reverse_edge(name, ReverseEdgeOperator::Eq, inner),
            }
        }
        ReverseEdgeOperator::Some => some(inner),
        ReverseEdgeOperator::None => some(inner).negate(),
        ReverseEdgeOperator::Every => some(inner.negate()).negate(),
    })
}

#[cfg(test)]
#[path = "optimizer_test.rs"]
mod optimizer_test;
