//! Filter expression tree
//!
//! Every comparison is scoped to a node type: leaf and edge names refer to its
//! components, reverse-edge names to its reverse edges, and the inner filter of
//! an edge (resp. reverse edge) is scoped to the edge's head (resp. referrer).

use serde_json::Value;
use std::fmt;

/// A filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Boolean(bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Leaf(LeafComparison),
    Edge(EdgeComparison),
    ReverseEdge(ReverseEdgeComparison),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOperator {
    Eq,
    Not,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
}

impl LeafOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            LeafOperator::Eq => "eq",
            LeafOperator::Not => "not",
            LeafOperator::Gt => "gt",
            LeafOperator::Gte => "gte",
            LeafOperator::Lt => "lt",
            LeafOperator::Lte => "lte",
            LeafOperator::In => "in",
            LeafOperator::NotIn => "not_in",
        }
    }

    /// `gt`, `gte`, `lt`, `lte`
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            LeafOperator::Gt | LeafOperator::Gte | LeafOperator::Lt | LeafOperator::Lte
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOperator {
    Eq,
    Not,
}

impl EdgeOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeOperator::Eq => "eq",
            EdgeOperator::Not => "not",
        }
    }
}

/// `Eq`/`Not` apply to unique reverse edges, `Some`/`None`/`Every` to the others
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverseEdgeOperator {
    Eq,
    Not,
    Some,
    None,
    Every,
}

impl ReverseEdgeOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            ReverseEdgeOperator::Eq => "eq",
            ReverseEdgeOperator::Not => "not",
            ReverseEdgeOperator::Some => "some",
            ReverseEdgeOperator::None => "none",
            ReverseEdgeOperator::Every => "every",
        }
    }

    pub fn is_unique(self) -> bool {
        matches!(self, ReverseEdgeOperator::Eq | ReverseEdgeOperator::Not)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafComparison {
    pub leaf: String,
    pub operator: LeafOperator,
    /// A scalar, or a list for `in` / `not_in`
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeComparison {
    pub edge: String,
    pub operator: EdgeOperator,
    pub filter: Box<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReverseEdgeComparison {
    pub reverse_edge: String,
    pub operator: ReverseEdgeOperator,
    pub filter: Box<Filter>,
}

impl Filter {
    pub const TRUE: Filter = Filter::Boolean(true);
    pub const FALSE: Filter = Filter::Boolean(false);

    pub fn leaf(leaf: impl Into<String>, operator: LeafOperator, value: Value) -> Self {
        Filter::Leaf(LeafComparison {
            leaf: leaf.into(),
            operator,
            value,
        })
    }

    pub fn eq(leaf: impl Into<String>, value: Value) -> Self {
        Self::leaf(leaf, LeafOperator::Eq, value)
    }

    pub fn edge(edge: impl Into<String>, operator: EdgeOperator, filter: Filter) -> Self {
        Filter::Edge(EdgeComparison {
            edge: edge.into(),
            operator,
            filter: Box::new(filter),
        })
    }

    pub fn reverse_edge(
        reverse_edge: impl Into<String>,
        operator: ReverseEdgeOperator,
        filter: Filter,
    ) -> Self {
        Filter::ReverseEdge(ReverseEdgeComparison {
            reverse_edge: reverse_edge.into(),
            operator,
            filter: Box::new(filter),
        })
    }

    pub fn and(operands: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(operands.into_iter().collect())
    }

    pub fn or(operands: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(operands.into_iter().collect())
    }

    /// Negation, folding booleans and double negations
    pub fn negate(self) -> Self {
        match self {
            Filter::Boolean(value) => Filter::Boolean(!value),
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Filter::Boolean(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Filter::Boolean(false))
    }
}

impl From<bool> for Filter {
    fn from(value: bool) -> Self {
        Filter::Boolean(value)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, operands: &[Filter]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (index, operand) in operands.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", operand)?;
    }
    write!(f, ")")
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Boolean(value) => write!(f, "{}", value),
            Filter::And(operands) => write_list(f, "AND", operands),
            Filter::Or(operands) => write_list(f, "OR", operands),
            Filter::Not(operand) => write!(f, "NOT({})", operand),
            Filter::Leaf(c) => write!(f, "{} {} {}", c.leaf, c.operator.as_str(), c.value),
            Filter::Edge(c) => write!(f, "{} {} {{{}}}", c.edge, c.operator.as_str(), c.filter),
            Filter::ReverseEdge(c) => write!(
                f,
                "{} {} {{{}}}",
                c.reverse_edge,
                c.operator.as_str(),
                c.filter
            ),
        }
    }
}
