//! Concurrent field resolution
//!
//! Every field of the graph gets one shared future. A field awaits the futures
//! of the fields it depends on and nothing else, so independent resolvers run
//! concurrently while dependent ones see their dependencies' parsed values.
//! All futures are driven to completion before the outcome is decided; the
//! first error in dependency order wins.

use super::field_graph::{FieldKind, FieldNode, MutationKind};
use super::reverse_edge::{self, ReverseEdgeActions};
use crate::models::{join_path, Edge, LeafType, NodeType, NodeValue, Selection, ValidationError};
use crate::operations::{BoundApi, OperationContext};
use crate::services::hooks::{FieldArgs, PayloadArgs};
use crate::services::{NodeService, NodeServiceError};
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::sync::Arc;

/// Parsed creation or update input
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedMutation {
    /// Component values handed to the connector
    pub(crate) payload: NodeValue,
    /// Actions to apply once the node is persisted
    pub(crate) reverse_edges: Vec<ReverseEdgeActions>,
}

impl ParsedMutation {
    /// Names of every field this mutation writes
    pub(crate) fn updated_fields(&self) -> Vec<String> {
        self.payload
            .keys()
            .cloned()
            .chain(
                self.reverse_edges
                    .iter()
                    .map(|actions| actions.reverse_edge.clone()),
            )
            .collect()
    }
}

#[derive(Debug, Clone)]
enum ParsedField {
    Absent,
    Value(Value),
    ReverseEdge(ReverseEdgeActions),
}

type FieldOutput = Result<ParsedField, Arc<NodeServiceError>>;
type FieldTask<'a> = Shared<BoxFuture<'a, FieldOutput>>;

/// Resolve and parse `input` against the node type's field graph
///
/// `current` is the node being updated, when some update field needs it.
pub(crate) async fn parse_mutation(
    service: &NodeService,
    context: &Arc<OperationContext>,
    node_type: &NodeType,
    kind: MutationKind,
    input: &Value,
    current: Option<&NodeValue>,
    path: &str,
) -> Result<ParsedMutation, NodeServiceError> {
    let object = input
        .as_object()
        .ok_or_else(|| ValidationError::not_an_object(path, input))?;
    let graph = service.field_graph(node_type, kind);

    for key in object.keys() {
        if !graph.contains(key) {
            return Err(ValidationError::invalid(
                join_path(path, key),
                format!("\"{}\" is not a {} field of \"{}\"", key, kind, node_type.name()),
            )
            .into());
        }
    }

    let hooks = service.hooks(node_type);
    let post_parse = match kind {
        MutationKind::Creation => hooks.post_creation_parse.clone(),
        MutationKind::Update => hooks.post_update_parse.clone(),
    };
    let api = BoundApi::new(service.clone(), context.clone());
    let deferred_required = post_parse.is_some();

    let mut tasks: Vec<Option<FieldTask<'_>>> = vec![None; graph.fields().len()];
    for &index in graph.order() {
        let field = &graph.fields()[index];
        let dependencies: Vec<(&str, FieldTask<'_>)> = field
            .dependencies
            .iter()
            .filter_map(|&dependency| {
                tasks[dependency]
                    .clone()
                    .map(|task| (graph.fields()[dependency].name.as_str(), task))
            })
            .collect();

        let task = resolve_field(FieldJob {
            service,
            api: &api,
            node_type,
            kind,
            field,
            raw: object.get(&field.name),
            current,
            deferred_required,
            parent_path: path,
        }, dependencies)
        .boxed()
        .shared();
        tasks[index] = Some(task);
    }

    let ordered: Vec<FieldTask<'_>> = graph
        .order()
        .iter()
        .filter_map(|&index| tasks[index].take())
        .collect();
    drop(tasks);
    let outputs = join_all(ordered).await;

    let mut parsed = ParsedMutation::default();
    let mut failure: Option<Arc<NodeServiceError>> = None;
    for (&index, output) in graph.order().iter().zip(outputs) {
        let field = &graph.fields()[index];
        match output {
            Ok(ParsedField::Value(value)) if field.kind.is_component() => {
                parsed.payload.insert(field.name.clone(), value);
            }
            Ok(ParsedField::ReverseEdge(actions)) => parsed.reverse_edges.push(actions),
            Ok(_) => {}
            Err(error) => {
                if failure.is_none() {
                    failure = Some(error);
                }
            }
        }
    }
    if let Some(error) = failure {
        return Err(Arc::try_unwrap(error)
            .unwrap_or_else(|shared| NodeServiceError::field(path, shared)));
    }

    if let Some(hook) = post_parse {
        parsed.payload = hook
            .parse(PayloadArgs {
                payload: parsed.payload,
                current,
                api: &api,
                path,
            })
            .await?;
        for key in parsed.payload.keys() {
            let writable = graph
                .field(key)
                .is_some_and(|field| field.kind.is_component());
            if !writable {
                return Err(ValidationError::invalid(
                    join_path(path, key),
                    format!("\"{}\" is not a writable component of \"{}\"", key, node_type.name()),
                )
                .into());
            }
        }
    }

    check_required(node_type, kind, &mut parsed.payload, path)?;
    Ok(parsed)
}

/// Creation payloads get every component, nulls filling the nullable gaps
fn check_required(
    node_type: &NodeType,
    kind: MutationKind,
    payload: &mut NodeValue,
    path: &str,
) -> Result<(), ValidationError> {
    for component in node_type.components() {
        match payload.get(component.name()) {
            None if kind == MutationKind::Creation => {
                if !component.is_nullable() {
                    return Err(ValidationError::required(join_path(path, component.name())));
                }
                payload.insert(component.name().to_string(), Value::Null);
            }
            Some(Value::Null) if !component.is_nullable() => {
                return Err(ValidationError::required(join_path(path, component.name())));
            }
            _ => {}
        }
    }
    Ok(())
}

struct FieldJob<'a> {
    service: &'a NodeService,
    api: &'a BoundApi,
    node_type: &'a NodeType,
    kind: MutationKind,
    field: &'a FieldNode,
    raw: Option<&'a Value>,
    current: Option<&'a NodeValue>,
    /// A post-parse hook may still fill missing required components
    deferred_required: bool,
    parent_path: &'a str,
}

async fn resolve_field<'a>(
    job: FieldJob<'a>,
    dependencies: Vec<(&'a str, FieldTask<'a>)>,
) -> FieldOutput {
    let mut resolved = NodeValue::new();
    for (name, dependency) in dependencies {
        if let ParsedField::Value(value) = dependency.await? {
            resolved.insert(name.to_string(), value);
        }
    }

    let path = join_path(job.parent_path, &job.field.name);
    parse_field(&job, &resolved, &path).await.map_err(Arc::new)
}

async fn parse_field(
    job: &FieldJob<'_>,
    dependencies: &NodeValue,
    path: &str,
) -> Result<ParsedField, NodeServiceError> {
    let value = match &job.field.resolver {
        Some(resolver) => {
            resolver
                .resolve(FieldArgs {
                    field: &job.field.name,
                    value: job.raw,
                    dependencies,
                    current: job.current,
                    api: job.api,
                    path,
                })
                .await?
        }
        None => job.raw.cloned(),
    };

    let node_type = job.node_type;
    let missing = || NodeServiceError::invalid_operation(format!(
        "\"{}\" has no field \"{}\"",
        node_type.name(),
        job.field.name
    ));

    match job.field.kind {
        FieldKind::Leaf => {
            let leaf = node_type.leaf(&job.field.name).ok_or_else(missing)?;
            parse_scalar(job, leaf.leaf_type(), leaf.is_nullable(), value, path)
        }
        FieldKind::Virtual => {
            let virtual_field = node_type.virtual_field(&job.field.name).ok_or_else(missing)?;
            parse_scalar(job, virtual_field.leaf_type(), virtual_field.is_nullable(), value, path)
        }
        FieldKind::Edge => {
            let edge = node_type.edge(&job.field.name).ok_or_else(missing)?;
            parse_edge(job, edge, value, path).await
        }
        FieldKind::ReverseEdge => {
            let reverse_edge = node_type.reverse_edge(&job.field.name).ok_or_else(missing)?;
            match value {
                None | Some(Value::Null) => Ok(ParsedField::Absent),
                Some(value) => Ok(ParsedField::ReverseEdge(reverse_edge::parse_actions(
                    job.service.schema(),
                    reverse_edge,
                    job.kind,
                    &value,
                    path,
                )?)),
            }
        }
    }
}

fn parse_missing(job: &FieldJob<'_>, nullable: bool, path: &str) -> Result<ParsedField, NodeServiceError> {
    match job.kind {
        MutationKind::Update => Ok(ParsedField::Absent),
        MutationKind::Creation if nullable => Ok(ParsedField::Value(Value::Null)),
        MutationKind::Creation if job.deferred_required => Ok(ParsedField::Absent),
        MutationKind::Creation => Err(ValidationError::required(path).into()),
    }
}

fn parse_scalar(
    job: &FieldJob<'_>,
    leaf_type: &LeafType,
    nullable: bool,
    value: Option<Value>,
    path: &str,
) -> Result<ParsedField, NodeServiceError> {
    match value {
        None => parse_missing(job, nullable, path),
        Some(Value::Null) if nullable => Ok(ParsedField::Value(Value::Null)),
        Some(Value::Null) => Err(ValidationError::required(path).into()),
        Some(value) => leaf_type
            .parse(&value)
            .map(ParsedField::Value)
            .map_err(|message| ValidationError::invalid(path, message).into()),
    }
}

/// Edge input is one of `connect`, `connectIfExists` or `create`; the parsed
/// value is the head's referenced unique value
async fn parse_edge(
    job: &FieldJob<'_>,
    edge: &Edge,
    value: Option<Value>,
    path: &str,
) -> Result<ParsedField, NodeServiceError> {
    let action = match value {
        None => return parse_missing(job, edge.is_nullable(), path),
        Some(Value::Null) if edge.is_nullable() => return Ok(ParsedField::Value(Value::Null)),
        Some(Value::Null) => return Err(ValidationError::required(path).into()),
        Some(Value::Object(action)) => action,
        Some(other) => return Err(ValidationError::not_an_object(path, &other).into()),
    };

    let mut entries = action.iter();
    let (name, argument) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(ValidationError::invalid(
                path,
                "expected exactly one of \"connect\", \"connectIfExists\", \"create\"",
            )
            .into())
        }
    };

    let service = job.service;
    let context = job.api.shared_context();
    let schema = service.schema();
    let head = schema.node_type(edge.head());
    let action_path = join_path(path, name);
    let reference = Selection::unique(edge.referenced_unique(schema));

    let node = match name.as_str() {
        "connect" => Some(
            service
                .lookup_unique(context, head, argument, &action_path)
                .await?
                .ok_or_else(|| NodeServiceError::not_found(head.name(), argument))?,
        ),
        "connectIfExists" => {
            if !edge.is_nullable() {
                return Err(ValidationError::invalid(
                    action_path,
                    "\"connectIfExists\" is only available on nullable edges",
                )
                .into());
            }
            service
                .lookup_unique(context, head, argument, &action_path)
                .await?
        }
        "create" => service
            .create_many_in(context, head, std::slice::from_ref(argument), vec![action_path.clone()])
            .await?
            .into_iter()
            .next(),
        other => {
            return Err(ValidationError::invalid(
                action_path,
                format!("unknown edge action \"{}\"", other),
            )
            .into())
        }
    };

    Ok(ParsedField::Value(match node {
        Some(node) => Value::Object(reference.project(&node)),
        None => Value::Null,
    }))
}
