//! Records, selections and ordering
//!
//! A record is a plain JSON object keyed by component name. Leaves hold their
//! normalized scalar value; edges hold the value of the head's referenced
//! unique constraint as a nested object (e.g. `{"parent": {"_id": "..."}}`),
//! or `null`.

use super::error::ValidationError;
use super::node_type::{NodeType, UniqueConstraint};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record of one node type
pub type NodeValue = serde_json::Map<String, Value>;

/// Sort direction for ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Ordering on a single leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse the client form `<leaf>_ASC` / `<leaf>_DESC`
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if let Some(field) = input.strip_suffix("_ASC") {
            Ok(Self::asc(field))
        } else if let Some(field) = input.strip_suffix("_DESC") {
            Ok(Self::desc(field))
        } else {
            Err(ValidationError::invalid(
                "orderBy",
                format!("expected \"<field>_ASC\" or \"<field>_DESC\", got \"{}\"", input),
            ))
        }
    }

    /// Orderings are only allowed on orderable leaves
    pub fn validate(&self, node_type: &NodeType) -> Result<(), ValidationError> {
        let leaf = node_type.leaf(&self.field).ok_or_else(|| {
            ValidationError::invalid(
                "orderBy",
                format!("\"{}\" has no leaf \"{}\"", node_type.name(), self.field),
            )
        })?;
        if !leaf.leaf_type().is_orderable() {
            return Err(ValidationError::invalid(
                "orderBy",
                format!(
                    "\"{}.{}\" of type \"{}\" cannot be ordered",
                    node_type.name(),
                    self.field,
                    leaf.leaf_type().name()
                ),
            ));
        }
        Ok(())
    }
}

/// Ordered list of component names to return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    fields: Vec<String>,
}

impl Selection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Self { fields: Vec::new() };
        for field in fields {
            selection.push(field.into());
        }
        selection
    }

    /// Every component, in declaration order
    pub fn all(node_type: &NodeType) -> Self {
        Self::new(node_type.components().iter().map(|c| c.name()))
    }

    /// The components of one unique constraint
    pub fn unique(constraint: &UniqueConstraint) -> Self {
        Self::new(constraint.components().iter().map(String::as_str))
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, field: String) {
        if !self.contains(&field) {
            self.fields.push(field);
        }
    }

    /// Union, keeping this selection's order first
    pub fn merge(&self, other: &Selection) -> Self {
        let mut merged = self.clone();
        for field in &other.fields {
            merged.push(field.clone());
        }
        merged
    }

    /// Every field must be a component of the node type
    pub fn validate(&self, node_type: &NodeType) -> Result<(), ValidationError> {
        if self.fields.is_empty() {
            return Err(ValidationError::invalid(
                "selection",
                "at least one field must be selected",
            ));
        }
        match self
            .fields
            .iter()
            .find(|field| node_type.component(field).is_none())
        {
            Some(unknown) => Err(ValidationError::invalid(
                "selection",
                format!("\"{}\" has no component \"{}\"", node_type.name(), unknown),
            )),
            None => Ok(()),
        }
    }

    /// Keep the selected fields of a record, in selection order
    ///
    /// Missing fields come out as `null`.
    pub fn project(&self, value: &NodeValue) -> NodeValue {
        self.fields
            .iter()
            .map(|field| {
                (
                    field.clone(),
                    value.get(field).cloned().unwrap_or(Value::Null),
                )
            })
            .collect()
    }
}
