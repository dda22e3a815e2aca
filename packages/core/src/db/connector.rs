//! Connector Trait - Storage Abstraction Layer
//!
//! This module defines the `Connector` trait the engine delegates persistence
//! to. The engine never talks to storage directly: it validates, authorizes and
//! optimizes every request, then hands the connector a statement whose filter
//! is already in canonical form (see [`crate::filter::optimize`]).
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and networked backends
//!    fit behind the same trait
//! 2. **Ownership Semantics**: Statements are passed by value
//! 3. **Error Handling**: Uses `anyhow::Result`; the engine wraps failures with
//!    the operation and node type without changing their kind
//! 4. **Transactions**: The operation lifecycle hooks (`pre_operation`,
//!    `post_successful_operation`, `post_failed_operation`, `post_operation`)
//!    are the place to begin / commit / roll back, keyed by the operation id

use crate::filter::Filter;
use crate::models::{NodeType, NodeValue, OrderBy, Selection};
use crate::operations::OperationContext;
use crate::services::NodeServiceError;
use anyhow::Result;
use async_trait::async_trait;

/// Arguments of [`Connector::find`]
#[derive(Debug, Clone)]
pub struct FindQuery {
    /// `None` matches every node
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub skip: usize,
    pub limit: usize,
    /// Components to return; connectors may return more
    pub selection: Selection,
}

/// Arguments of [`Connector::count`]
#[derive(Debug, Clone, Default)]
pub struct CountQuery {
    pub filter: Option<Filter>,
}

/// Arguments of [`Connector::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateStatement {
    /// Parsed records, one per node to create, with every component present
    pub payloads: Vec<NodeValue>,
}

/// Arguments of [`Connector::update`]
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    /// `None` updates every matching node
    pub limit: Option<usize>,
    /// Parsed component values to set
    pub patch: NodeValue,
}

/// Arguments of [`Connector::delete`]
#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

/// Pluggable storage backend
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: one connector serves every
/// concurrent operation.
///
/// # Returned Records
///
/// `find`, `create`, `update` and `delete` return complete records (every
/// component, edges as nested reference objects). `update` returns records
/// after the patch, `delete` returns them as they were.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Find nodes matching the query, sorted, skipped and limited
    async fn find(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        query: FindQuery,
    ) -> Result<Vec<NodeValue>>;

    /// Count nodes matching the query
    async fn count(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        query: CountQuery,
    ) -> Result<u64>;

    /// Create one node per payload
    ///
    /// # Errors
    ///
    /// Returns error if a payload conflicts with an existing node on one of the
    /// node type's unique constraints. No node is created in that case.
    async fn create(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        statement: CreateStatement,
    ) -> Result<Vec<NodeValue>>;

    /// Apply the patch to the matching nodes
    async fn update(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        statement: UpdateStatement,
    ) -> Result<Vec<NodeValue>>;

    /// Delete the matching nodes
    async fn delete(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        statement: DeleteStatement,
    ) -> Result<Vec<NodeValue>>;

    //
    // OPERATION LIFECYCLE
    //

    /// Called once before the outermost operation runs
    async fn pre_operation(&self, _context: &OperationContext) -> Result<()> {
        Ok(())
    }

    /// Called once after the outermost operation succeeded
    async fn post_successful_operation(&self, _context: &OperationContext) -> Result<()> {
        Ok(())
    }

    /// Called once after the outermost operation failed
    async fn post_failed_operation(
        &self,
        _context: &OperationContext,
        _error: &NodeServiceError,
    ) -> Result<()> {
        Ok(())
    }

    /// Always called last, whatever the outcome
    async fn post_operation(&self, _context: &OperationContext) -> Result<()> {
        Ok(())
    }
}
