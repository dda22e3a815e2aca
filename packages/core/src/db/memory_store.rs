//! MemoryStore - In-Memory Connector
//!
//! A [`Connector`] keeping every node type's records in memory, in insertion
//! order. It evaluates canonical filters directly:
//!
//! - edge comparisons whose inner filter only reads the stored reference (see
//!   [`is_reference_only`]) are answered from the reference, others load the
//!   head node
//! - reverse-edge comparisons scan the referrers pointing at the node
//!
//! Unique constraints are enforced on create and update. Every call, lifecycle
//! hooks included, is recorded so tests can assert what reached storage.

use crate::db::connector::{
    Connector, CountQuery, CreateStatement, DeleteStatement, FindQuery, UpdateStatement,
};
use crate::filter::{
    is_reference_only, EdgeOperator, Filter, LeafComparison, LeafOperator, ReverseEdgeComparison,
    ReverseEdgeOperator,
};
use crate::models::{
    LeafType, NodeType, NodeValue, OrderBy, Schema, Selection, SortDirection,
};
use crate::operations::OperationContext;
use crate::services::NodeServiceError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use uuid::Uuid;

/// One recorded connector call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: &'static str,
    /// `None` for lifecycle hooks
    pub node_type: Option<String>,
    pub operation_id: Uuid,
}

impl StoreCall {
    /// `"find Category"`, or the bare operation for lifecycle hooks
    pub fn label(&self) -> String {
        match &self.node_type {
            Some(node_type) => format!("{} {}", self.operation, node_type),
            None => self.operation.to_string(),
        }
    }
}

/// In-memory connector
pub struct MemoryStore {
    schema: Arc<Schema>,
    // One table per node type, indexed by node type id
    tables: RwLock<Vec<Vec<NodeValue>>>,
    calls: Mutex<Vec<StoreCall>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        let tables = vec![Vec::new(); schema.len()];
        Self {
            schema,
            tables: RwLock::new(tables),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Recorded calls, oldest first
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Labels of the recorded calls, oldest first
    pub fn call_labels(&self) -> Vec<String> {
        self.calls().iter().map(StoreCall::label).collect()
    }

    /// Number of recorded calls of one operation (`"find"`, `"pre_operation"`, ...)
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make every later call of `operation` fail
    pub fn fail_on(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    pub fn clear_failures(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Stored records of a node type, in insertion order
    pub async fn records(&self, node_type: &str) -> Result<Vec<NodeValue>> {
        let node_type = self.node_type(node_type)?;
        Ok(self.tables.read().await[node_type.id().index()].clone())
    }

    fn node_type(&self, name: &str) -> Result<&NodeType> {
        self.schema
            .node_type_by_name(name)
            .ok_or_else(|| anyhow!("Unknown node type \"{}\"", name))
    }

    fn record(
        &self,
        operation: &'static str,
        node_type: Option<&NodeType>,
        context: &OperationContext,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoreCall {
                operation,
                node_type: node_type.map(|node_type| node_type.name().to_string()),
                operation_id: context.id(),
            });

        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(operation);
        if failing {
            return Err(anyhow!("Injected failure in {}", operation));
        }
        Ok(())
    }

    //
    // FILTER EVALUATION
    //

    /// Indexes of the matching records, sorted, skipped and limited
    fn select(
        &self,
        tables: &[Vec<NodeValue>],
        node_type: &NodeType,
        filter: Option<&Filter>,
        order_by: &[OrderBy],
        skip: usize,
        limit: usize,
    ) -> Vec<usize> {
        let table = &tables[node_type.id().index()];
        let mut indexes: Vec<usize> = (0..table.len())
            .filter(|&index| {
                filter.map_or(true, |filter| {
                    self.matches(tables, node_type, &table[index], filter)
                })
            })
            .collect();

        if !order_by.is_empty() {
            indexes.sort_by(|&a, &b| compare_records(node_type, &table[a], &table[b], order_by));
        }
        indexes.into_iter().skip(skip).take(limit).collect()
    }

    fn matches(
        &self,
        tables: &[Vec<NodeValue>],
        node_type: &NodeType,
        node: &NodeValue,
        filter: &Filter,
    ) -> bool {
        match filter {
            Filter::Boolean(value) => *value,
            Filter::And(operands) => operands
                .iter()
                .all(|operand| self.matches(tables, node_type, node, operand)),
            Filter::Or(operands) => operands
                .iter()
                .any(|operand| self.matches(tables, node_type, node, operand)),
            Filter::Not(operand) => !self.matches(tables, node_type, node, operand),
            Filter::Leaf(comparison) => {
                let leaf_type = node_type
                    .leaf(&comparison.leaf)
                    .map(|leaf| leaf.leaf_type());
                leaf_matches(
                    leaf_type,
                    node.get(&comparison.leaf).unwrap_or(&Value::Null),
                    comparison,
                )
            }
            Filter::Edge(comparison) => {
                let Some(edge) = node_type.edge(&comparison.edge) else {
                    return false;
                };
                let reference = match node.get(edge.name()) {
                    Some(Value::Object(reference)) => reference,
                    _ => return false,
                };
                let head = self.schema.node_type(edge.head());

                let inner = if is_reference_only(&self.schema, edge, &comparison.filter) {
                    self.matches(tables, head, reference, &comparison.filter)
                } else {
                    let unique = Selection::unique(edge.referenced_unique(&self.schema));
                    tables[head.id().index()]
                        .iter()
                        .find(|candidate| unique.project(candidate) == *reference)
                        .is_some_and(|target| {
                            self.matches(tables, head, target, &comparison.filter)
                        })
                };

                match comparison.operator {
                    EdgeOperator::Eq => inner,
                    EdgeOperator::Not => !inner,
                }
            }
            Filter::ReverseEdge(comparison) => {
                self.reverse_edge_matches(tables, node_type, node, comparison)
            }
        }
    }

    fn reverse_edge_matches(
        &self,
        tables: &[Vec<NodeValue>],
        node_type: &NodeType,
        node: &NodeValue,
        comparison: &ReverseEdgeComparison,
    ) -> bool {
        let Some(reverse_edge) = node_type.reverse_edge(&comparison.reverse_edge) else {
            return false;
        };
        let referrer = self.schema.node_type(reverse_edge.referrer());
        let edge = reverse_edge.original_edge(&self.schema);
        let reference = Value::Object(
            Selection::unique(edge.referenced_unique(&self.schema)).project(node),
        );

        let mut referrers = tables[referrer.id().index()]
            .iter()
            .filter(|candidate| candidate.get(edge.name()) == Some(&reference));
        let filter = &comparison.filter;

        match comparison.operator {
            ReverseEdgeOperator::Eq | ReverseEdgeOperator::Some => {
                referrers.any(|candidate| self.matches(tables, referrer, candidate, filter))
            }
            ReverseEdgeOperator::Not => {
                referrers.any(|candidate| !self.matches(tables, referrer, candidate, filter))
            }
            ReverseEdgeOperator::None => {
                !referrers.any(|candidate| self.matches(tables, referrer, candidate, filter))
            }
            ReverseEdgeOperator::Every => {
                referrers.all(|candidate| self.matches(tables, referrer, candidate, filter))
            }
        }
    }

    /// First unique constraint violated by `table`, if any
    ///
    /// A constraint whose components are all null does not apply.
    fn find_violation<'s>(&'s self, node_type: &'s NodeType, table: &[NodeValue]) -> Option<&'s str> {
        for constraint in node_type.unique_constraints() {
            let mut seen: Vec<Vec<&Value>> = Vec::with_capacity(table.len());
            for record in table {
                let key: Vec<&Value> = constraint
                    .components()
                    .iter()
                    .map(|component| record.get(component).unwrap_or(&Value::Null))
                    .collect();
                if key.iter().all(|value| value.is_null()) {
                    continue;
                }
                if seen.contains(&key) {
                    return Some(constraint.name());
                }
                seen.push(key);
            }
        }
        None
    }
}

fn leaf_matches(leaf_type: Option<&LeafType>, stored: &Value, comparison: &LeafComparison) -> bool {
    let expected = &comparison.value;
    match comparison.operator {
        LeafOperator::Eq => values_equal(leaf_type, stored, expected),
        LeafOperator::Not => !values_equal(leaf_type, stored, expected),
        LeafOperator::In => in_list(leaf_type, stored, expected),
        LeafOperator::NotIn => !in_list(leaf_type, stored, expected),
        LeafOperator::Gt | LeafOperator::Gte | LeafOperator::Lt | LeafOperator::Lte => {
            if stored.is_null() || expected.is_null() {
                return false;
            }
            let Some(ordering) = leaf_type.and_then(|leaf_type| leaf_type.compare(stored, expected))
            else {
                return false;
            };
            match comparison.operator {
                LeafOperator::Gt => ordering == Ordering::Greater,
                LeafOperator::Gte => ordering != Ordering::Less,
                LeafOperator::Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            }
        }
    }
}

fn values_equal(leaf_type: Option<&LeafType>, a: &Value, b: &Value) -> bool {
    a == b
        || leaf_type
            .and_then(|leaf_type| leaf_type.compare(a, b))
            .is_some_and(|ordering| ordering == Ordering::Equal)
}

fn in_list(leaf_type: Option<&LeafType>, stored: &Value, list: &Value) -> bool {
    list.as_array()
        .is_some_and(|values| values.iter().any(|value| values_equal(leaf_type, stored, value)))
}

/// Nulls sort first
fn compare_records(node_type: &NodeType, a: &NodeValue, b: &NodeValue, order_by: &[OrderBy]) -> Ordering {
    for order in order_by {
        let leaf_type = node_type.leaf(&order.field).map(|leaf| leaf.leaf_type());
        let left = a.get(&order.field).unwrap_or(&Value::Null);
        let right = b.get(&order.field).unwrap_or(&Value::Null);

        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => leaf_type
                .and_then(|leaf_type| leaf_type.compare(left, right))
                .unwrap_or(Ordering::Equal),
        };
        let ordering = match order.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl Connector for MemoryStore {
    async fn find(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        query: FindQuery,
    ) -> Result<Vec<NodeValue>> {
        self.record("find", Some(node_type), context)?;
        let tables = self.tables.read().await;
        let table = &tables[node_type.id().index()];

        Ok(self
            .select(
                &tables,
                node_type,
                query.filter.as_ref(),
                &query.order_by,
                query.skip,
                query.limit,
            )
            .into_iter()
            .map(|index| query.selection.project(&table[index]))
            .collect())
    }

    async fn count(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        query: CountQuery,
    ) -> Result<u64> {
        self.record("count", Some(node_type), context)?;
        let tables = self.tables.read().await;
        let count = self
            .select(&tables, node_type, query.filter.as_ref(), &[], 0, usize::MAX)
            .len();
        Ok(count as u64)
    }

    async fn create(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        statement: CreateStatement,
    ) -> Result<Vec<NodeValue>> {
        self.record("create", Some(node_type), context)?;
        let mut tables = self.tables.write().await;
        let table = &tables[node_type.id().index()];

        let records: Vec<NodeValue> = statement
            .payloads
            .into_iter()
            .map(|payload| {
                let mut record = NodeValue::new();
                for component in node_type.components() {
                    let value = payload.get(component.name()).cloned().unwrap_or(Value::Null);
                    record.insert(component.name().to_string(), value);
                }
                record
            })
            .collect();

        let mut candidate = table.clone();
        candidate.extend(records.iter().cloned());
        if let Some(constraint) = self.find_violation(node_type, &candidate) {
            return Err(anyhow!(
                "Duplicate value for unique constraint \"{}.{}\"",
                node_type.name(),
                constraint
            ));
        }

        tables[node_type.id().index()] = candidate;
        Ok(records)
    }

    async fn update(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        statement: UpdateStatement,
    ) -> Result<Vec<NodeValue>> {
        self.record("update", Some(node_type), context)?;
        let mut tables = self.tables.write().await;
        let indexes = self.select(
            &tables,
            node_type,
            statement.filter.as_ref(),
            &statement.order_by,
            0,
            statement.limit.unwrap_or(usize::MAX),
        );

        let mut candidate = tables[node_type.id().index()].clone();
        for &index in &indexes {
            for (name, value) in &statement.patch {
                candidate[index].insert(name.clone(), value.clone());
            }
        }
        if let Some(constraint) = self.find_violation(node_type, &candidate) {
            return Err(anyhow!(
                "Duplicate value for unique constraint \"{}.{}\"",
                node_type.name(),
                constraint
            ));
        }

        let updated = indexes.iter().map(|&index| candidate[index].clone()).collect();
        tables[node_type.id().index()] = candidate;
        Ok(updated)
    }

    async fn delete(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        statement: DeleteStatement,
    ) -> Result<Vec<NodeValue>> {
        self.record("delete", Some(node_type), context)?;
        let mut tables = self.tables.write().await;
        let indexes = self.select(
            &tables,
            node_type,
            statement.filter.as_ref(),
            &statement.order_by,
            0,
            statement.limit.unwrap_or(usize::MAX),
        );

        let table = &mut tables[node_type.id().index()];
        let deleted: Vec<NodeValue> = indexes.iter().map(|&index| table[index].clone()).collect();
        let removed: HashSet<usize> = indexes.into_iter().collect();
        let mut position = 0;
        table.retain(|_| {
            let keep = !removed.contains(&position);
            position += 1;
            keep
        });
        Ok(deleted)
    }

    async fn pre_operation(&self, context: &OperationContext) -> Result<()> {
        self.record("pre_operation", None, context)
    }

    async fn post_successful_operation(&self, context: &OperationContext) -> Result<()> {
        self.record("post_successful_operation", None, context)
    }

    async fn post_failed_operation(
        &self,
        context: &OperationContext,
        error: &NodeServiceError,
    ) -> Result<()> {
        tracing::debug!("Operation {} failed: {}", context.id(), error);
        self.record("post_failed_operation", None, context)
    }

    async fn post_operation(&self, context: &OperationContext) -> Result<()> {
        self.record("post_operation", None, context)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("node_types", &self.schema.len())
            .field("calls", &self.calls.lock().unwrap_or_else(PoisonError::into_inner).len())
            .finish()
    }
}

#[cfg(test)]
#[path = "memory_store_test.rs"]
mod memory_store_test;
