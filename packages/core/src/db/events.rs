//! Change Notifications
//!
//! This module defines the changes emitted when an operation creates, updates
//! or deletes nodes, and the bus that delivers them.
//!
//! # Event Flow
//!
//! 1. An operation persists a change through the connector
//! 2. The change is queued on the operation's context
//! 3. Once the outermost operation's success and final hooks have completed,
//!    queued changes are dispatched in FIFO order: listeners registered with
//!    [`ChangeBus::on_change`] run synchronously, then the change is broadcast
//!    to every [`ChangeBus::subscribe`] receiver
//! 4. An operation that fails, in any hook included, discards its queued changes

use crate::models::NodeValue;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// A persisted change to one node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    /// A new node was created
    #[serde(rename_all = "camelCase")]
    Created { node_type: String, node: NodeValue },

    /// An existing node was updated
    #[serde(rename_all = "camelCase")]
    Updated {
        node_type: String,
        node: NodeValue,
        updated_fields: Vec<String>,
    },

    /// A node was deleted; `node` is its last known value
    #[serde(rename_all = "camelCase")]
    Deleted { node_type: String, node: NodeValue },
}

impl NodeChange {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            NodeChange::Created { .. } => "node:created",
            NodeChange::Updated { .. } => "node:updated",
            NodeChange::Deleted { .. } => "node:deleted",
        }
    }

    pub fn node_type(&self) -> &str {
        match self {
            NodeChange::Created { node_type, .. }
            | NodeChange::Updated { node_type, .. }
            | NodeChange::Deleted { node_type, .. } => node_type,
        }
    }

    pub fn node(&self) -> &NodeValue {
        match self {
            NodeChange::Created { node, .. }
            | NodeChange::Updated { node, .. }
            | NodeChange::Deleted { node, .. } => node,
        }
    }
}

/// Synchronous change listener
pub type ChangeListener = Arc<dyn Fn(&NodeChange) + Send + Sync>;

/// Listener registry plus broadcast channel
pub struct ChangeBus {
    // (node type filter, listener), in registration order
    listeners: RwLock<Vec<(Option<String>, ChangeListener)>>,
    sender: broadcast::Sender<NodeChange>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Register a listener for one node type, or for every node type with `None`
    pub fn on_change<F>(&self, node_type: Option<&str>, listener: F)
    where
        F: Fn(&NodeChange) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((node_type.map(str::to_string), Arc::new(listener)));
    }

    /// Subscribe to every change
    ///
    /// Slow receivers lag and miss changes once the channel capacity is exceeded.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeChange> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver one change to listeners, then to subscribers
    pub(crate) fn dispatch(&self, change: NodeChange) {
        // Listeners may register other listeners: call them outside the lock.
        let listeners: Vec<ChangeListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(node_type, _)| {
                node_type
                    .as_deref()
                    .map_or(true, |name| name == change.node_type())
            })
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(&change);
        }

        // No receivers is not an error
        if self.sender.send(change).is_err() {
            tracing::trace!("No change subscribers");
        }
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listener_count())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn created(node_type: &str) -> NodeChange {
        NodeChange::Created {
            node_type: node_type.to_string(),
            node: json!({ "slug": "a" }).as_object().unwrap().clone(),
        }
    }

    /// Contract test: the serialized form consumers rely on
    #[test]
    fn test_node_change_serialization_contract() {
        let change = NodeChange::Updated {
            node_type: "Category".to_string(),
            node: json!({ "slug": "a" }).as_object().unwrap().clone(),
            updated_fields: vec!["slug".to_string()],
        };

        let parsed = serde_json::to_value(&change).unwrap();
        assert_eq!(parsed.get("type").unwrap(), "updated");
        assert_eq!(parsed.get("nodeType").unwrap(), "Category");
        assert_eq!(parsed.get("updatedFields").unwrap(), &json!(["slug"]));
        assert_eq!(change.event_type(), "node:updated");
    }

    #[test]
    fn test_listeners_are_filtered_by_node_type() {
        let bus = ChangeBus::new(8);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let all = seen.clone();
        bus.on_change(None, move |change| {
            all.lock().unwrap().push(format!("all:{}", change.node_type()))
        });
        let tags = seen.clone();
        bus.on_change(Some("Tag"), move |change| {
            tags.lock().unwrap().push(format!("tag:{}", change.node_type()))
        });

        bus.dispatch(created("Category"));
        bus.dispatch(created("Tag"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["all:Category", "all:Tag", "tag:Tag"]
        );
    }

    #[tokio::test]
    async fn test_subscribers_receive_changes() {
        let bus = ChangeBus::new(8);
        let mut receiver = bus.subscribe();

        bus.dispatch(created("Tag"));

        let change = receiver.recv().await.unwrap();
        assert_eq!(change.event_type(), "node:created");
        assert_eq!(change.node_type(), "Tag");
    }
}
