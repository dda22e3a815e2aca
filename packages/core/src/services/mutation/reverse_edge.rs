//! Reverse-edge actions
//!
//! Input on a reverse edge manipulates the referrers of the node being
//! created or updated. Actions are parsed with the rest of the payload and
//! applied once the node exists: destructive actions (`delete`, `disconnect`)
//! before creative ones (`connect`, `create`).
//!
//! | reverse edge | actions |
//! |--------------|---------|
//! | unique       | exactly one of `delete: true`, `disconnect: true`, `connect: <unique>`, `create: <data>` |
//! | non-unique   | any of `delete`, `deleteMany`, `disconnect`, `disconnectMany`, `connect`, `connectMany`, `create` |
//!
//! Creation only accepts `connect`, `connectMany` and `create`.

use super::field_graph::MutationKind;
use crate::filter::{equality_filter, parse_filter, EdgeOperator, Filter};
use crate::models::{join_path, resolve_unique, NodeType, NodeValue, ReverseEdge, Schema, Selection, ValidationError};
use crate::operations::OperationContext;
use crate::services::{NodeService, NodeServiceError};
use serde_json::{json, Value};
use std::sync::Arc;

const UNIQUE_ACTIONS: [&str; 4] = ["delete", "disconnect", "connect", "create"];

// Application order
const ACTIONS: [&str; 7] = [
    "delete",
    "deleteMany",
    "disconnect",
    "disconnectMany",
    "connect",
    "connectMany",
    "create",
];

const CREATIVE_ACTIONS: [&str; 3] = ["connect", "connectMany", "create"];

/// Parsed actions on one reverse edge, in application order
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReverseEdgeActions {
    pub(crate) reverse_edge: String,
    pub(crate) actions: Vec<ReverseEdgeAction>,
}

/// One action; filters are scoped to the referrer node type
///
/// `unique` keeps the raw unique value of strict actions, which fail with
/// "not found" when nothing matches.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReverseEdgeAction {
    Delete {
        filter: Filter,
        unique: Option<Value>,
        path: String,
    },
    Disconnect {
        filter: Filter,
        unique: Option<Value>,
        path: String,
    },
    Connect {
        filter: Filter,
        unique: Option<Value>,
        path: String,
    },
    Create {
        data: Value,
        path: String,
    },
}

/// Parse the input of one reverse edge
pub(crate) fn parse_actions(
    schema: &Schema,
    reverse_edge: &ReverseEdge,
    kind: MutationKind,
    input: &Value,
    path: &str,
) -> Result<ReverseEdgeActions, NodeServiceError> {
    let object = input
        .as_object()
        .ok_or_else(|| ValidationError::not_an_object(path, input))?;
    let referrer = schema.node_type(reverse_edge.referrer());
    let edge = reverse_edge.original_edge(schema);
    let unique = reverse_edge.is_unique();

    for key in object.keys() {
        let known = if unique {
            UNIQUE_ACTIONS.contains(&key.as_str())
        } else {
            ACTIONS.contains(&key.as_str())
        };
        if !known {
            return Err(invalid(join_path(path, key), format!("unknown action \"{}\"", key)));
        }
        if kind == MutationKind::Creation && !CREATIVE_ACTIONS.contains(&key.as_str()) {
            return Err(invalid(
                join_path(path, key),
                format!("\"{}\" is not available on creation", key),
            ));
        }
    }
    if unique && object.len() != 1 {
        return Err(invalid(path, "expected exactly one action"));
    }
    if object.is_empty() {
        return Err(invalid(path, "expected at least one action"));
    }

    let mut actions = Vec::new();
    for name in ACTIONS {
        let Some(value) = object.get(name) else {
            continue;
        };
        let action_path = join_path(path, name);

        if matches!(name, "disconnect" | "disconnectMany") && (!edge.is_nullable() || edge.is_immutable()) {
            return Err(invalid(
                action_path,
                format!("\"{}.{}\" cannot be disconnected", referrer.name(), edge.name()),
            ));
        }
        if matches!(name, "connect" | "connectMany") && edge.is_immutable() {
            return Err(invalid(
                action_path,
                format!("\"{}.{}\" is immutable", referrer.name(), edge.name()),
            ));
        }

        match (name, unique) {
            ("delete", true) | ("disconnect", true) => {
                if value != &Value::Bool(true) {
                    return Err(invalid(action_path, "expected true"));
                }
                let filter = Filter::TRUE;
                actions.push(if name == "delete" {
                    ReverseEdgeAction::Delete { filter, unique: None, path: action_path }
                } else {
                    ReverseEdgeAction::Disconnect { filter, unique: None, path: action_path }
                });
            }
            ("connect", true) => {
                let filter = unique_filter(schema, referrer, value, &action_path)?;
                actions.push(ReverseEdgeAction::Connect {
                    filter,
                    unique: Some(value.clone()),
                    path: action_path,
                });
            }
            ("create", true) => {
                actions.push(creation(edge.name(), value, action_path)?);
            }
            ("delete", false) | ("disconnect", false) | ("connect", false) => {
                for (index, item) in list(value, &action_path)?.iter().enumerate() {
                    let item_path = format!("{}[{}]", action_path, index);
                    let filter = unique_filter(schema, referrer, item, &item_path)?;
                    let strict = Some(item.clone());
                    actions.push(match name {
                        "delete" => ReverseEdgeAction::Delete { filter, unique: strict, path: item_path },
                        "disconnect" => ReverseEdgeAction::Disconnect { filter, unique: strict, path: item_path },
                        _ => ReverseEdgeAction::Connect { filter, unique: strict, path: item_path },
                    });
                }
            }
            ("deleteMany", false) | ("disconnectMany", false) | ("connectMany", false) => {
                for (index, item) in list(value, &action_path)?.iter().enumerate() {
                    let item_path = format!("{}[{}]", action_path, index);
                    let filter = parse_filter(schema, referrer, item)?;
                    actions.push(match name {
                        "deleteMany" => ReverseEdgeAction::Delete { filter, unique: None, path: item_path },
                        "disconnectMany" => ReverseEdgeAction::Disconnect { filter, unique: None, path: item_path },
                        _ => ReverseEdgeAction::Connect { filter, unique: None, path: item_path },
                    });
                }
            }
            ("create", false) => {
                for (index, item) in list(value, &action_path)?.iter().enumerate() {
                    actions.push(creation(edge.name(), item, format!("{}[{}]", action_path, index))?);
                }
            }
            _ => {}
        }
    }

    Ok(ReverseEdgeActions {
        reverse_edge: reverse_edge.name().to_string(),
        actions,
    })
}

/// Apply parsed actions on behalf of `node`, a persisted node of `node_type`
pub(crate) async fn apply(
    service: &NodeService,
    context: &Arc<OperationContext>,
    node_type: &NodeType,
    node: &NodeValue,
    actions: &ReverseEdgeActions,
) -> Result<(), NodeServiceError> {
    let schema = service.schema();
    let reverse_edge = node_type
        .reverse_edge(&actions.reverse_edge)
        .ok_or_else(|| {
            NodeServiceError::invalid_operation(format!(
                "\"{}\" has no reverse edge \"{}\"",
                node_type.name(),
                actions.reverse_edge
            ))
        })?;
    let referrer = schema.node_type(reverse_edge.referrer());
    let edge = reverse_edge.original_edge(schema);

    let reference = Selection::unique(edge.referenced_unique(schema)).project(node);
    let attached = Filter::edge(
        edge.name(),
        EdgeOperator::Eq,
        equality_filter(schema, node_type, &reference)?,
    );

    for action in &actions.actions {
        match action {
            ReverseEdgeAction::Delete { filter, unique, path } => {
                tracing::debug!("Deleting {} through {}.{}", referrer.name(), node_type.name(), reverse_edge.name());
                let deleted = service
                    .delete_filtered(
                        context,
                        referrer,
                        Filter::and([filter.clone(), attached.clone()]),
                        Vec::new(),
                        unique.as_ref().map(|_| 1),
                    )
                    .await?;
                ensure_found(referrer, unique, deleted.is_empty(), path)?;
            }
            ReverseEdgeAction::Disconnect { filter, unique, path } => {
                tracing::debug!("Disconnecting {} from {}.{}", referrer.name(), node_type.name(), reverse_edge.name());
                let data = json!({ edge.name(): null });
                let updated = service
                    .update_filtered(
                        context,
                        referrer,
                        Filter::and([filter.clone(), attached.clone()]),
                        Vec::new(),
                        unique.as_ref().map(|_| 1),
                        &data,
                        path,
                    )
                    .await?;
                ensure_found(referrer, unique, updated.is_empty(), path)?;
            }
            ReverseEdgeAction::Connect { filter, unique, path } => {
                tracing::debug!("Connecting {} to {}.{}", referrer.name(), node_type.name(), reverse_edge.name());
                let data = json!({ edge.name(): { "connect": reference } });
                let updated = service
                    .update_filtered(
                        context,
                        referrer,
                        filter.clone(),
                        Vec::new(),
                        unique.as_ref().map(|_| 1),
                        &data,
                        path,
                    )
                    .await?;
                ensure_found(referrer, unique, updated.is_empty(), path)?;
            }
            ReverseEdgeAction::Create { data, path } => {
                let mut data = data.clone();
                if let Value::Object(object) = &mut data {
                    object.insert(edge.name().to_string(), json!({ "connect": reference }));
                }
                service
                    .create_many_in(context, referrer, std::slice::from_ref(&data), vec![path.clone()])
                    .await?;
            }
        }
    }
    Ok(())
}

fn ensure_found(
    referrer: &NodeType,
    unique: &Option<Value>,
    nothing_matched: bool,
    path: &str,
) -> Result<(), NodeServiceError> {
    match unique {
        Some(value) if nothing_matched => Err(NodeServiceError::field(
            path,
            Arc::new(NodeServiceError::not_found(referrer.name(), value)),
        )),
        _ => Ok(()),
    }
}

fn invalid(path: impl Into<String>, message: impl Into<String>) -> NodeServiceError {
    ValidationError::invalid(path, message).into()
}

fn list<'v>(value: &'v Value, path: &str) -> Result<&'v [Value], NodeServiceError> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(invalid(path, "expected a list")),
    }
}

fn unique_filter(
    schema: &Schema,
    referrer: &NodeType,
    value: &Value,
    path: &str,
) -> Result<Filter, NodeServiceError> {
    let unique = resolve_unique(schema, referrer, value, None, path)?;
    Ok(equality_filter(schema, referrer, unique.value())?)
}

/// Nested creation data; the edge back to the parent is set on apply
fn creation(edge: &str, value: &Value, path: String) -> Result<ReverseEdgeAction, NodeServiceError> {
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::not_an_object(path.as_str(), value))?;
    if object.contains_key(edge) {
        return Err(invalid(
            join_path(&path, edge),
            format!("\"{}\" is set from the parent node", edge),
        ));
    }
    Ok(ReverseEdgeAction::Create {
        data: value.clone(),
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::blog_schema;

    fn parse(node_type: &str, reverse_edge: &str, kind: MutationKind, input: Value) -> Result<ReverseEdgeActions, NodeServiceError> {
        let schema = blog_schema();
        let node_type = schema.node_type_by_name(node_type).unwrap();
        let reverse_edge = node_type.reverse_edge(reverse_edge).unwrap();
        parse_actions(&schema, reverse_edge, kind, &input, "data.field")
    }

    #[test]
    fn test_destructive_actions_come_first() {
        let parsed = parse(
            "Category",
            "children",
            MutationKind::Update,
            json!({
                "create": [{ "title": "A", "slug": "a", "order": 1 }],
                "disconnectMany": [{ "slug": "old" }],
                "delete": [{ "id": 4 }]
            }),
        )
        .unwrap();

        assert_eq!(parsed.reverse_edge, "children");
        assert!(matches!(
            &parsed.actions[0],
            ReverseEdgeAction::Delete { unique: Some(_), path, .. } if path == "data.field.delete[0]"
        ));
        assert!(matches!(&parsed.actions[1], ReverseEdgeAction::Disconnect { unique: None, .. }));
        assert!(matches!(&parsed.actions[2], ReverseEdgeAction::Create { .. }));
    }

    #[test]
    fn test_unique_reverse_edge_takes_exactly_one_action() {
        let parsed = parse("Article", "extension", MutationKind::Update, json!({ "delete": true })).unwrap();
        assert_eq!(
            parsed.actions,
            vec![ReverseEdgeAction::Delete {
                filter: Filter::TRUE,
                unique: None,
                path: "data.field.delete".to_string()
            }]
        );

        assert!(parse(
            "Article",
            "extension",
            MutationKind::Update,
            json!({ "delete": true, "create": { "source": "x" } })
        )
        .is_err());
        assert!(parse("Article", "extension", MutationKind::Update, json!({ "deleteMany": [] })).is_err());
    }

    #[test]
    fn test_creation_only_accepts_creative_actions() {
        let err = parse("Category", "children", MutationKind::Creation, json!({ "deleteMany": [{}] })).unwrap_err();
        assert!(err.is_validation());

        assert!(parse(
            "Category",
            "children",
            MutationKind::Creation,
            json!({ "connect": [{ "id": 2 }], "create": [] })
        )
        .is_ok());
    }

    #[test]
    fn test_disconnect_requires_a_nullable_mutable_edge() {
        // ArticleTag.article is immutable and required
        let err = parse("Article", "tags", MutationKind::Update, json!({ "disconnectMany": [{}] })).unwrap_err();
        assert!(err.to_string().contains("cannot be disconnected"));

        assert!(parse("Category", "children", MutationKind::Update, json!({ "disconnect": [{ "id": 3 }] })).is_ok());
    }

    #[test]
    fn test_nested_creation_cannot_set_the_edge() {
        let err = parse(
            "Category",
            "children",
            MutationKind::Creation,
            json!({ "create": [{ "title": "A", "slug": "a", "order": 1, "parent": null }] }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("data.field.create[0].parent"));
    }
}
