//! Operation Types
//!
//! This module provides the argument types of every engine operation, the
//! per-operation context and the [`BoundApi`] handle nested code uses to run
//! further operations inside the same context.
//!
//! Arguments deserialize from the client shape (`where`, `orderBy`, `skip`,
//! `first`, `data`, `selection`), so a query-protocol front end can pass its
//! input through unchanged.

mod bound_api;
mod context;

pub use bound_api::BoundApi;
pub use context::{OperationContext, RequestContext};

use crate::models::{OrderBy, Selection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arguments of `find_many`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindManyArgs {
    /// Client filter; `null` matches everything
    #[serde(default, rename = "where")]
    pub where_: Value,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub skip: Option<usize>,
    /// Page size; defaults to the configured `default_limit`
    #[serde(default)]
    pub first: Option<usize>,
    /// Defaults to every component
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl FindManyArgs {
    pub fn new(where_: Value) -> Self {
        Self {
            where_,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by.push(order_by);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn first(mut self, first: usize) -> Self {
        self.first = Some(first);
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Arguments of `count`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountArgs {
    #[serde(default, rename = "where")]
    pub where_: Value,
}

impl CountArgs {
    pub fn new(where_: Value) -> Self {
        Self { where_ }
    }
}

/// Arguments of `get_one` / `get_one_if_exists`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetOneArgs {
    /// Value of one of the node type's unique constraints
    #[serde(rename = "where")]
    pub where_: Value,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl GetOneArgs {
    pub fn new(where_: Value) -> Self {
        Self {
            where_,
            selection: None,
        }
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Arguments of `create_one`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOneArgs {
    pub data: Value,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl CreateOneArgs {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            selection: None,
        }
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Arguments of `create_many`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateManyArgs {
    pub data: Vec<Value>,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl CreateManyArgs {
    pub fn new(data: Vec<Value>) -> Self {
        Self {
            data,
            selection: None,
        }
    }
}

/// Arguments of `update_one` / `update_one_if_exists`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateOneArgs {
    #[serde(rename = "where")]
    pub where_: Value,
    pub data: Value,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl UpdateOneArgs {
    pub fn new(where_: Value, data: Value) -> Self {
        Self {
            where_,
            data,
            selection: None,
        }
    }
}

/// Arguments of `update_many`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManyArgs {
    #[serde(default, rename = "where")]
    pub where_: Value,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    /// `None` updates every matching node
    #[serde(default)]
    pub first: Option<usize>,
    pub data: Value,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl UpdateManyArgs {
    pub fn new(where_: Value, data: Value) -> Self {
        Self {
            where_,
            data,
            ..Self::default()
        }
    }
}

/// Arguments of `delete_one` / `delete_one_if_exists`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteOneArgs {
    #[serde(rename = "where")]
    pub where_: Value,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl DeleteOneArgs {
    pub fn new(where_: Value) -> Self {
        Self {
            where_,
            selection: None,
        }
    }
}

/// Arguments of `delete_many`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteManyArgs {
    #[serde(default, rename = "where")]
    pub where_: Value,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub first: Option<usize>,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl DeleteManyArgs {
    pub fn new(where_: Value) -> Self {
        Self {
            where_,
            ..Self::default()
        }
    }
}

/// Arguments of `upsert`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsertArgs {
    #[serde(rename = "where")]
    pub where_: Value,
    pub create: Value,
    pub update: Value,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl UpsertArgs {
    pub fn new(where_: Value, create: Value, update: Value) -> Self {
        Self {
            where_,
            create,
            update,
            selection: None,
        }
    }
}
