//! Request and operation contexts
//!
//! A [`RequestContext`] describes who is asking; an [`OperationContext`] is the
//! per-invocation state shared by the outermost operation and every nested
//! operation it triggers: memoized authorization filters, queued changes and
//! the revocation flag.

use crate::db::NodeChange;
use crate::filter::Filter;
use crate::models::NodeTypeId;
use crate::services::NodeServiceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Ambient request information, consumed by authorization hooks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Authenticated subject, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,

    /// Free-form attributes (tenant, locale, ...)
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// State of one outermost operation
#[derive(Debug)]
pub struct OperationContext {
    id: Uuid,
    request: RequestContext,
    authorizations: Mutex<HashMap<NodeTypeId, Filter>>,
    changes: Mutex<VecDeque<NodeChange>>,
    revoked: AtomicBool,
}

impl OperationContext {
    pub(crate) fn new(request: RequestContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            authorizations: Mutex::new(HashMap::new()),
            changes: Mutex::new(VecDeque::new()),
            revoked: AtomicBool::new(false),
        }
    }

    /// Unique id of the operation, stable across nested calls
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    pub(crate) fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
    }

    pub(crate) fn ensure_live(&self) -> Result<(), NodeServiceError> {
        if self.is_revoked() {
            Err(NodeServiceError::revoked(self.id))
        } else {
            Ok(())
        }
    }

    pub(crate) fn authorization(&self, node_type: NodeTypeId) -> Option<Filter> {
        self.authorizations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&node_type)
            .cloned()
    }

    pub(crate) fn set_authorization(&self, node_type: NodeTypeId, filter: Filter) {
        self.authorizations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node_type, filter);
    }

    pub(crate) fn track_change(&self, change: NodeChange) {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(change);
    }

    /// Queued changes, oldest first
    pub(crate) fn take_changes(&self) -> Vec<NodeChange> {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn pending_changes(&self) -> usize {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
