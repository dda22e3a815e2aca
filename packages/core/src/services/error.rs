//! Service Layer Error Types
//!
//! This module defines the error type of every engine operation. Kinds stay
//! distinguishable after wrapping so callers can branch on "does not exist"
//! versus "bad request" versus "storage failed".

use crate::filter::FilterError;
use crate::models::{DefinitionError, ValidationError};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Service operation errors
#[derive(Error, Debug)]
pub enum NodeServiceError {
    /// A strict get / update / delete found nothing
    #[error("{node_type} not found: {where_}")]
    NotFound { node_type: String, where_: String },

    /// Client input failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Filter does not match the schema
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// Schema or hook configuration is invalid
    #[error("Invalid definition: {0}")]
    Definition(#[from] DefinitionError),

    /// The connector failed
    #[error("Connector {operation} failed on \"{node_type}\": {source}")]
    Connector {
        operation: &'static str,
        node_type: String,
        source: anyhow::Error,
    },

    /// A user hook rejected the operation
    #[error("Hook \"{hook}\" failed: {message}")]
    Hook { hook: String, message: String },

    /// An error shared by several concurrent field resolutions
    #[error("{path}: {source}")]
    Field {
        path: String,
        source: Arc<NodeServiceError>,
    },

    /// Authorization denies the operation outright
    #[error("{operation} on \"{node_type}\" is forbidden")]
    Forbidden {
        node_type: String,
        operation: &'static str,
    },

    /// An API handle was used after its operation ended
    #[error("Operation {operation_id} is over, its API handle has been revoked")]
    Revoked { operation_id: Uuid },

    /// The operation cannot be applied (unknown node type, immutable node type, ...)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl NodeServiceError {
    /// Create a not found error, rendering the lookup value
    pub fn not_found(node_type: impl Into<String>, where_: &Value) -> Self {
        Self::NotFound {
            node_type: node_type.into(),
            where_: where_.to_string(),
        }
    }

    /// Create a connector error with operation context
    pub fn connector(
        operation: &'static str,
        node_type: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Connector {
            operation,
            node_type: node_type.into(),
            source,
        }
    }

    /// Create a hook error
    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Wrap an error shared between field resolutions
    pub fn field(path: impl Into<String>, source: Arc<NodeServiceError>) -> Self {
        Self::Field {
            path: path.into(),
            source,
        }
    }

    /// Create a forbidden error
    pub fn forbidden(node_type: impl Into<String>, operation: &'static str) -> Self {
        Self::Forbidden {
            node_type: node_type.into(),
            operation,
        }
    }

    /// Create a revoked handle error
    pub fn revoked(operation_id: Uuid) -> Self {
        Self::Revoked { operation_id }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// The error under any `Field` wrappers
    pub fn root_cause(&self) -> &NodeServiceError {
        match self {
            Self::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Self::NotFound { .. })
    }

    /// Bad client input: validation and filter errors
    pub fn is_validation(&self) -> bool {
        matches!(self.root_cause(), Self::Validation(_) | Self::Filter(_))
    }

    pub fn is_revoked(&self) -> bool {
        matches!(self.root_cause(), Self::Revoked { .. })
    }
}
