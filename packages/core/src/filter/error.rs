//! Filter Error Types
//!
//! Raised when a filter tree does not match the schema it is scoped to, whether
//! it was parsed from client input or built in code.

use thiserror::Error;

/// Filter / schema mismatch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Leaf comparison on a name that is not a leaf of the node type
    #[error("Unknown leaf \"{leaf}\" on node type \"{node_type}\"")]
    UnknownLeaf { node_type: String, leaf: String },

    /// Edge comparison on a name that is not an edge of the node type
    #[error("Unknown edge \"{edge}\" on node type \"{node_type}\"")]
    UnknownEdge { node_type: String, edge: String },

    /// Reverse-edge comparison on a name that is not a reverse edge of the node type
    #[error("Unknown reverse edge \"{reverse_edge}\" on node type \"{node_type}\"")]
    UnknownReverseEdge {
        node_type: String,
        reverse_edge: String,
    },

    /// Client filter key matching no field / operator combination
    #[error("Unknown filter field \"{field}\" on node type \"{node_type}\"")]
    UnknownField { node_type: String, field: String },

    /// Operator not applicable to the field
    #[error("Operator \"{operator}\" is not supported by \"{node_type}.{field}\"")]
    InvalidOperator {
        node_type: String,
        field: String,
        operator: String,
    },

    /// Value not accepted by the field's type
    #[error("Invalid value for \"{node_type}.{field}\": {message}")]
    InvalidValue {
        node_type: String,
        field: String,
        message: String,
    },

    /// Malformed client input
    #[error("Invalid filter input at \"{path}\": {message}")]
    InvalidInput { path: String, message: String },
}

impl FilterError {
    pub fn unknown_leaf(node_type: impl Into<String>, leaf: impl Into<String>) -> Self {
        Self::UnknownLeaf {
            node_type: node_type.into(),
            leaf: leaf.into(),
        }
    }

    pub fn unknown_edge(node_type: impl Into<String>, edge: impl Into<String>) -> Self {
        Self::UnknownEdge {
            node_type: node_type.into(),
            edge: edge.into(),
        }
    }

    pub fn unknown_reverse_edge(
        node_type: impl Into<String>,
        reverse_edge: impl Into<String>,
    ) -> Self {
        Self::UnknownReverseEdge {
            node_type: node_type.into(),
            reverse_edge: reverse_edge.into(),
        }
    }

    pub fn unknown_field(node_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            node_type: node_type.into(),
            field: field.into(),
        }
    }

    pub fn invalid_operator(
        node_type: impl Into<String>,
        field: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        Self::InvalidOperator {
            node_type: node_type.into(),
            field: field.into(),
            operator: operator.into(),
        }
    }

    pub fn invalid_value(
        node_type: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            node_type: node_type.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }
}
