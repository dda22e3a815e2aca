//! Schema and Input Error Types
//!
//! Two families live here:
//!
//! - [`DefinitionError`] - raised while a schema (or a node type's mutation plan)
//!   is being built. Always fatal at startup, always prefixed with the path of the
//!   offending node type / component / unique constraint.
//! - [`ValidationError`] - raised while client input is checked at runtime.
//!   Carries the dotted path of the offending field and is never fatal to the process.

use thiserror::Error;

/// Schema construction errors
///
/// The `path` identifies what was being built, e.g. `Category`, `Category.parent`,
/// `Category.unique[2]` or `Category.creation.slug`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// A node type, component, unique constraint or field name breaks the naming rule
    #[error("{path} - invalid name \"{name}\"")]
    InvalidName { path: String, name: String },

    /// The same name is declared twice in one scope
    #[error("{path} - \"{name}\" is declared more than once")]
    Duplicate { path: String, name: String },

    /// A referenced node type / component / unique constraint does not exist
    #[error("{path} - unknown {kind} \"{name}\"")]
    Unknown {
        path: String,
        kind: &'static str,
        name: String,
    },

    /// A collection that must not be empty is empty
    #[error("{path} - {what} must not be empty")]
    Empty { path: String, what: &'static str },

    /// Field dependencies do not form a DAG
    #[error("{path} - circular dependency: {cycle}")]
    CircularDependency { path: String, cycle: String },

    /// Any other structural violation
    #[error("{path} - {message}")]
    Invalid { path: String, message: String },
}

impl DefinitionError {
    /// Create an invalid name error
    pub fn invalid_name(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidName {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Create a duplicate declaration error
    pub fn duplicate(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Create an unknown reference error
    pub fn unknown(path: impl Into<String>, kind: &'static str, name: impl Into<String>) -> Self {
        Self::Unknown {
            path: path.into(),
            kind,
            name: name.into(),
        }
    }

    /// Create an empty collection error
    pub fn empty(path: impl Into<String>, what: &'static str) -> Self {
        Self::Empty {
            path: path.into(),
            what,
        }
    }

    /// Create a circular dependency error from the cycle's field names
    ///
    /// The cycle is rendered closed: `["first", "second", "first"]` becomes
    /// `first -> second -> first`.
    pub fn circular_dependency(path: impl Into<String>, cycle: &[String]) -> Self {
        Self::CircularDependency {
            path: path.into(),
            cycle: cycle.join(" -> "),
        }
    }

    /// Create a generic definition error
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Path of the definition element that failed
    pub fn path(&self) -> &str {
        match self {
            Self::InvalidName { path, .. }
            | Self::Duplicate { path, .. }
            | Self::Unknown { path, .. }
            | Self::Empty { path, .. }
            | Self::CircularDependency { path, .. }
            | Self::Invalid { path, .. } => path,
        }
    }
}

/// Runtime input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Malformed value
    #[error("{path}: {message}")]
    Invalid { path: String, message: String },

    /// An object was expected
    #[error("{path}: expected an object, got {found}")]
    NotAnObject { path: String, found: String },

    /// A required value is missing or null
    #[error("{path}: a non-null value is required")]
    Required { path: String },

    /// No unique constraint could be satisfied from the given value
    #[error("{path}: the value does not identify a unique \"{node_type}\"")]
    UniqueValueNotFound { path: String, node_type: String },
}

impl ValidationError {
    /// Create an invalid value error
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not-an-object error, describing the JSON kind that was found
    pub fn not_an_object(path: impl Into<String>, found: &serde_json::Value) -> Self {
        Self::NotAnObject {
            path: path.into(),
            found: json_kind(found).to_string(),
        }
    }

    /// Create a required value error
    pub fn required(path: impl Into<String>) -> Self {
        Self::Required { path: path.into() }
    }

    /// Create a unique-value-not-found error
    pub fn unique_value_not_found(path: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self::UniqueValueNotFound {
            path: path.into(),
            node_type: node_type.into(),
        }
    }

    /// Dotted path of the offending field
    pub fn path(&self) -> &str {
        match self {
            Self::Invalid { path, .. }
            | Self::NotAnObject { path, .. }
            | Self::Required { path }
            | Self::UniqueValueNotFound { path, .. } => path,
        }
    }
}

/// Join a parent path and a child segment with a dot
pub fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}

/// Short name of a JSON value's kind, for error messages
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
