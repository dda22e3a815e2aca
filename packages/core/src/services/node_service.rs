//! Node Service - Operation Orchestration
//!
//! This module provides the entry point of the engine. Every public operation
//! runs inside one [`OperationContext`]:
//!
//! 1. `pre_operation` connector hook
//! 2. the operation itself, plus every nested operation it triggers through a
//!    [`BoundApi`] (field resolvers, reverse-edge actions, lifecycle hooks)
//! 3. `post_successful_operation` then queued change notifications, or
//!    `post_failed_operation` and the queued changes are discarded
//! 4. `post_operation`, whatever the outcome
//! 5. the context is revoked: leaked `BoundApi` handles stop working
//!
//! # Authorization
//!
//! A node type's authorization hook is evaluated once per context and node
//! type, turned into a canonical filter and AND-ed into every read, update and
//! delete. When the composed filter is `false` the connector is not called.

use crate::config::EngineConfig;
use crate::db::{
    ChangeBus, Connector, CountQuery, CreateStatement, DeleteStatement, FindQuery, NodeChange,
    UpdateStatement,
};
use crate::filter::{equality_filter, optimize, parse_filter, Filter};
use crate::models::{
    resolve_unique, DefinitionError, NodeType, NodeValue, OrderBy, Schema, Selection,
    ValidationError,
};
use crate::operations::{
    BoundApi, CountArgs, CreateManyArgs, CreateOneArgs, DeleteManyArgs, DeleteOneArgs,
    FindManyArgs, GetOneArgs, OperationContext, RequestContext, UpdateManyArgs, UpdateOneArgs,
    UpsertArgs,
};
use crate::services::error::NodeServiceError;
use crate::services::hooks::{Access, NodeTypeHooks};
use crate::services::input_shape::{self, InputObjectShape};
use crate::services::mutation::{
    parse_mutation, reverse_edge, FieldGraph, MutationKind, ParsedMutation,
};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

struct NodeTypeRuntime {
    hooks: NodeTypeHooks,
    creation: FieldGraph,
    update: FieldGraph,
}

struct ServiceInner {
    schema: Arc<Schema>,
    connector: Arc<dyn Connector>,
    // Indexed by node type id
    runtimes: Vec<NodeTypeRuntime>,
    changes: ChangeBus,
    config: EngineConfig,
}

/// Schema-driven data access over a [`Connector`]
///
/// Cheap to clone; clones share hooks, listeners and the connector.
#[derive(Clone)]
pub struct NodeService {
    inner: Arc<ServiceInner>,
}

impl NodeService {
    /// Build the service, validating hooks against the schema
    ///
    /// # Errors
    ///
    /// - hooks registered for an unknown node type
    /// - field configs naming unknown fields, or with cyclic dependencies
    /// - an invalid configuration (reported at path `config`)
    pub fn new(
        schema: Arc<Schema>,
        connector: Arc<dyn Connector>,
        mut hooks: HashMap<String, NodeTypeHooks>,
        config: EngineConfig,
    ) -> Result<Self, DefinitionError> {
        config
            .validate()
            .map_err(|message| DefinitionError::invalid("config", message))?;

        let mut unknown: Vec<&String> = hooks
            .keys()
            .filter(|name| schema.node_type_by_name(name).is_none())
            .collect();
        unknown.sort();
        if let Some(name) = unknown.first() {
            return Err(DefinitionError::unknown("hooks", "node type", name.as_str()));
        }

        let mut runtimes = Vec::with_capacity(schema.len());
        for node_type in schema.node_types() {
            let hooks = hooks.remove(node_type.name()).unwrap_or_default();
            let creation = FieldGraph::build(node_type, MutationKind::Creation, &hooks.creation)?;
            let update = FieldGraph::build(node_type, MutationKind::Update, &hooks.update)?;
            tracing::debug!(
                "Field graphs of {}: {:?} / {:?}",
                node_type.name(),
                creation,
                update
            );
            runtimes.push(NodeTypeRuntime {
                hooks,
                creation,
                update,
            });
        }

        tracing::info!("Node service ready with {} node types", schema.len());

        Ok(Self {
            inner: Arc::new(ServiceInner {
                changes: ChangeBus::new(config.event_channel_capacity),
                schema,
                connector,
                runtimes,
                config,
            }),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.inner.connector
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn changes(&self) -> &ChangeBus {
        &self.inner.changes
    }

    /// Register a change listener, for one node type or every node type
    pub fn on_change<F>(&self, node_type: Option<&str>, listener: F)
    where
        F: Fn(&NodeChange) + Send + Sync + 'static,
    {
        self.inner.changes.on_change(node_type, listener);
    }

    /// Subscribe to changes of every node type
    pub fn subscribe(&self) -> broadcast::Receiver<NodeChange> {
        self.inner.changes.subscribe()
    }

    //
    // INPUT SHAPES
    //

    pub fn where_input_shape(&self, node_type: &str) -> Result<InputObjectShape, NodeServiceError> {
        let node_type = self.public_node_type(node_type)?;
        Ok(input_shape::where_input_shape(&self.inner.schema, node_type))
    }

    pub fn where_unique_input_shape(
        &self,
        node_type: &str,
    ) -> Result<InputObjectShape, NodeServiceError> {
        let node_type = self.public_node_type(node_type)?;
        Ok(input_shape::where_unique_input_shape(&self.inner.schema, node_type))
    }

    /// Creation input; fields with a resolver are never required
    pub fn creation_input_shape(
        &self,
        node_type: &str,
    ) -> Result<InputObjectShape, NodeServiceError> {
        let node_type = self.public_node_type(node_type)?;
        let graph = self.field_graph(node_type, MutationKind::Creation);
        Ok(input_shape::mutation_input_shape(&self.inner.schema, node_type, graph))
    }

    pub fn update_input_shape(&self, node_type: &str) -> Result<InputObjectShape, NodeServiceError> {
        let node_type = self.public_node_type(node_type)?;
        ensure_mutable(node_type)?;
        let graph = self.field_graph(node_type, MutationKind::Update);
        Ok(input_shape::mutation_input_shape(&self.inner.schema, node_type, graph))
    }

    fn public_node_type(&self, name: &str) -> Result<&NodeType, NodeServiceError> {
        let node_type = self.node_type_named(name)?;
        if !node_type.is_public() {
            return Err(NodeServiceError::invalid_operation(format!(
                "Node type \"{}\" is not public",
                name
            )));
        }
        Ok(node_type)
    }

    //
    // OPERATION LIFECYCLE
    //

    /// Run `operation` as one outermost operation
    ///
    /// Every call made through the given [`BoundApi`] shares the operation's
    /// context; connector lifecycle hooks run once around the whole closure.
    pub async fn execute<F, Fut, T>(
        &self,
        request: RequestContext,
        operation: F,
    ) -> Result<T, NodeServiceError>
    where
        F: FnOnce(BoundApi) -> Fut,
        Fut: Future<Output = Result<T, NodeServiceError>>,
    {
        let context = Arc::new(OperationContext::new(request));
        let connector = &self.inner.connector;
        tracing::debug!("Starting operation {}", context.id());

        let outcome = match connector.pre_operation(&context).await {
            Ok(()) => operation(BoundApi::new(self.clone(), context.clone())).await,
            Err(e) => Err(NodeServiceError::connector("pre_operation", "*", e)),
        };

        let outcome = match outcome {
            Ok(value) => match connector.post_successful_operation(&context).await {
                Ok(()) => Ok(value),
                Err(e) => Err(NodeServiceError::connector("post_successful_operation", "*", e)),
            },
            Err(error) => {
                if let Err(e) = connector.post_failed_operation(&context, &error).await {
                    tracing::warn!(
                        "Failure hook of operation {} failed: {}",
                        context.id(),
                        e
                    );
                }
                Err(error)
            }
        };

        let outcome = match connector.post_operation(&context).await {
            Ok(()) => outcome,
            Err(e) => {
                tracing::warn!("Final hook of operation {} failed: {}", context.id(), e);
                match outcome {
                    Ok(_) => Err(NodeServiceError::connector("post_operation", "*", e)),
                    Err(error) => Err(error),
                }
            }
        };

        context.revoke();
        let changes = context.take_changes();
        match &outcome {
            Ok(_) => {
                for change in changes {
                    self.inner.changes.dispatch(change);
                }
            }
            Err(error) => tracing::debug!("Operation {} failed: {}", context.id(), error),
        }
        outcome
    }

    pub async fn find_many(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: FindManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.find_many(node_type, args).await
        })
        .await
    }

    pub async fn count(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: CountArgs,
    ) -> Result<u64, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.count(node_type, args).await
        })
        .await
    }

    pub async fn get_one(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: GetOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.get_one(node_type, args).await
        })
        .await
    }

    pub async fn get_one_if_exists(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: GetOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.get_one_if_exists(node_type, args).await
        })
        .await
    }

    pub async fn create_one(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: CreateOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.create_one(node_type, args).await
        })
        .await
    }

    pub async fn create_many(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: CreateManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.create_many(node_type, args).await
        })
        .await
    }

    pub async fn update_one(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: UpdateOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.update_one(node_type, args).await
        })
        .await
    }

    pub async fn update_one_if_exists(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: UpdateOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.update_one_if_exists(node_type, args).await
        })
        .await
    }

    pub async fn update_many(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: UpdateManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.update_many(node_type, args).await
        })
        .await
    }

    pub async fn delete_one(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: DeleteOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.delete_one(node_type, args).await
        })
        .await
    }

    pub async fn delete_one_if_exists(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: DeleteOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.delete_one_if_exists(node_type, args).await
        })
        .await
    }

    pub async fn delete_many(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: DeleteManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.delete_many(node_type, args).await
        })
        .await
    }

    pub async fn upsert(
        &self,
        request: &RequestContext,
        node_type: &str,
        args: UpsertArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.execute(request.clone(), |api| async move {
            api.upsert(node_type, args).await
        })
        .await
    }

    //
    // INTERNALS (shared by the bound API and the mutation pipeline)
    //

    pub(crate) fn node_type_named(&self, name: &str) -> Result<&NodeType, NodeServiceError> {
        self.inner.schema.node_type_by_name(name).ok_or_else(|| {
            NodeServiceError::invalid_operation(format!("Unknown node type \"{}\"", name))
        })
    }

    fn runtime(&self, node_type: &NodeType) -> &NodeTypeRuntime {
        &self.inner.runtimes[node_type.id().index()]
    }

    pub(crate) fn hooks(&self, node_type: &NodeType) -> &NodeTypeHooks {
        &self.runtime(node_type).hooks
    }

    pub(crate) fn field_graph(&self, node_type: &NodeType, kind: MutationKind) -> &FieldGraph {
        let runtime = self.runtime(node_type);
        match kind {
            MutationKind::Creation => &runtime.creation,
            MutationKind::Update => &runtime.update,
        }
    }

    /// Canonical authorization filter, memoized per context
    fn authorization(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
    ) -> Result<Filter, NodeServiceError> {
        if let Some(filter) = context.authorization(node_type.id()) {
            return Ok(filter);
        }

        let filter = match &self.hooks(node_type).authorization {
            None => Filter::TRUE,
            Some(authorize) => match authorize(context.request()) {
                Access::Granted => Filter::TRUE,
                Access::Denied => Filter::FALSE,
                Access::Filtered(input) => {
                    let parsed = parse_filter(self.schema(), node_type, &input)?;
                    optimize(self.schema(), node_type, &parsed)?
                }
            },
        };
        context.set_authorization(node_type.id(), filter.clone());
        Ok(filter)
    }

    /// AND the authorization into `filter` and optimize
    fn compose(
        &self,
        context: &OperationContext,
        node_type: &NodeType,
        filter: Filter,
    ) -> Result<Filter, NodeServiceError> {
        let authorization = self.authorization(context, node_type)?;
        Ok(optimize(
            self.schema(),
            node_type,
            &Filter::and([authorization, filter]),
        )?)
    }

    /// Canonical filter matching `node` by its identifier
    fn identifier_filter(
        &self,
        node_type: &NodeType,
        node: &NodeValue,
    ) -> Result<Filter, NodeServiceError> {
        let identifier = Selection::unique(node_type.identifier()).project(node);
        let filter = equality_filter(self.schema(), node_type, &identifier)?;
        Ok(optimize(self.schema(), node_type, &filter)?)
    }

    fn page_size(&self, first: Option<usize>) -> Result<usize, ValidationError> {
        let config = &self.inner.config;
        match first {
            None => Ok(config.default_limit),
            Some(first) if first > config.max_limit => Err(ValidationError::invalid(
                "first",
                format!("cannot exceed {}", config.max_limit),
            )),
            Some(first) => Ok(first),
        }
    }

    fn selection(
        &self,
        node_type: &NodeType,
        selection: Option<Selection>,
    ) -> Result<Selection, ValidationError> {
        match selection {
            None => Ok(Selection::all(node_type)),
            Some(selection) => {
                selection.validate(node_type)?;
                Ok(selection)
            }
        }
    }

    /// Find with the authorization applied
    pub(crate) async fn find_filtered(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        filter: Filter,
        order_by: Vec<OrderBy>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        let filter = self.compose(context, node_type, filter)?;
        self.find_composed(context, node_type, filter, order_by, skip, limit)
            .await
    }

    /// Find with an already canonical filter
    async fn find_composed(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        filter: Filter,
        order_by: Vec<OrderBy>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        if filter.is_false() || limit == 0 {
            tracing::debug!("Skipping find on {}: nothing can match", node_type.name());
            return Ok(Vec::new());
        }

        self.inner
            .connector
            .find(
                context,
                node_type,
                FindQuery {
                    filter: non_trivial(filter),
                    order_by,
                    skip,
                    limit,
                    selection: Selection::all(node_type),
                },
            )
            .await
            .map_err(|e| NodeServiceError::connector("find", node_type.name(), e))
    }

    /// Node matching a raw unique value, if visible
    pub(crate) async fn lookup_unique(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        raw: &Value,
        path: &str,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        let unique = resolve_unique(self.schema(), node_type, raw, None, path)?;
        let filter = equality_filter(self.schema(), node_type, unique.value())?;
        Ok(self
            .find_filtered(context, node_type, filter, Vec::new(), 0, 1)
            .await?
            .into_iter()
            .next())
    }

    /// Fetch nodes again after lifecycle hooks that may have changed them
    async fn reselect(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        nodes: Vec<NodeValue>,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        let mut refreshed = Vec::with_capacity(nodes.len());
        for node in nodes {
            let filter = self.identifier_filter(node_type, &node)?;
            if let Some(current) = self
                .find_composed(context, node_type, filter, Vec::new(), 0, 1)
                .await?
                .into_iter()
                .next()
            {
                refreshed.push(current);
            }
        }
        Ok(refreshed)
    }

    pub(crate) async fn find_many_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: FindManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        let filter = parse_filter(self.schema(), node_type, &args.where_)?;
        let limit = self.page_size(args.first)?;
        for order_by in &args.order_by {
            order_by.validate(node_type)?;
        }
        let selection = self.selection(node_type, args.selection)?;

        let nodes = self
            .find_filtered(
                context,
                node_type,
                filter,
                args.order_by,
                args.skip.unwrap_or(0),
                limit,
            )
            .await?;
        Ok(project_all(&selection, nodes))
    }

    pub(crate) async fn count_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: CountArgs,
    ) -> Result<u64, NodeServiceError> {
        let filter = parse_filter(self.schema(), node_type, &args.where_)?;
        let filter = self.compose(context, node_type, filter)?;
        if filter.is_false() {
            tracing::debug!("Skipping count on {}: nothing can match", node_type.name());
            return Ok(0);
        }

        self.inner
            .connector
            .count(
                context,
                node_type,
                CountQuery {
                    filter: non_trivial(filter),
                },
            )
            .await
            .map_err(|e| NodeServiceError::connector("count", node_type.name(), e))
    }

    pub(crate) async fn get_one_if_exists_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: GetOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        let selection = self.selection(node_type, args.selection)?;
        let node = self
            .lookup_unique(context, node_type, &args.where_, "where")
            .await?;
        Ok(node.map(|node| selection.project(&node)))
    }

    pub(crate) async fn get_one_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: GetOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        let where_ = args.where_.clone();
        self.get_one_if_exists_in(context, node_type, args)
            .await?
            .ok_or_else(|| NodeServiceError::not_found(node_type.name(), &where_))
    }

    pub(crate) async fn create_one_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: CreateOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        let selection = self.selection(node_type, args.selection)?;
        let node = self
            .create_many_in(
                context,
                node_type,
                std::slice::from_ref(&args.data),
                vec!["data".to_string()],
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                NodeServiceError::invalid_operation(format!(
                    "The connector created no {}",
                    node_type.name()
                ))
            })?;
        Ok(selection.project(&node))
    }

    pub(crate) async fn create_many_args_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: CreateManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        let selection = self.selection(node_type, args.selection)?;
        let paths = (0..args.data.len())
            .map(|index| format!("data[{}]", index))
            .collect();
        let nodes = self
            .create_many_in(context, node_type, &args.data, paths)
            .await?;
        Ok(project_all(&selection, nodes))
    }

    /// Parse every input concurrently, create them with one connector call,
    /// then apply reverse-edge actions node by node
    ///
    /// Boxed: nested creations recurse through the mutation pipeline.
    pub(crate) fn create_many_in<'a>(
        &'a self,
        context: &'a Arc<OperationContext>,
        node_type: &'a NodeType,
        data: &'a [Value],
        paths: Vec<String>,
    ) -> BoxFuture<'a, Result<Vec<NodeValue>, NodeServiceError>> {
        async move {
            if self.authorization(context, node_type)?.is_false() {
                return Err(NodeServiceError::forbidden(node_type.name(), "create"));
            }
            if data.is_empty() {
                return Ok(Vec::new());
            }

            let parsed: Vec<ParsedMutation> = join_all(data.iter().zip(&paths).map(
                |(input, path)| {
                    parse_mutation(
                        self,
                        context,
                        node_type,
                        MutationKind::Creation,
                        input,
                        None,
                        path,
                    )
                },
            ))
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;

            let payloads = parsed.iter().map(|p| p.payload.clone()).collect();
            let nodes = self
                .inner
                .connector
                .create(context, node_type, CreateStatement { payloads })
                .await
                .map_err(|e| NodeServiceError::connector("create", node_type.name(), e))?;

            for (node, parsed) in nodes.iter().zip(&parsed) {
                context.track_change(NodeChange::Created {
                    node_type: node_type.name().to_string(),
                    node: node.clone(),
                });
                for actions in &parsed.reverse_edges {
                    reverse_edge::apply(self, context, node_type, node, actions).await?;
                }
            }

            match &self.hooks(node_type).lifecycle {
                None => Ok(nodes),
                Some(lifecycle) => {
                    let api = BoundApi::new(self.clone(), context.clone());
                    for node in &nodes {
                        lifecycle.post_create(&api, node).await?;
                    }
                    self.reselect(context, node_type, nodes).await
                }
            }
        }
        .boxed()
    }

    pub(crate) async fn update_one_if_exists_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: UpdateOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        ensure_mutable(node_type)?;
        let selection = self.selection(node_type, args.selection)?;
        let unique = resolve_unique(self.schema(), node_type, &args.where_, None, "where")?;
        let filter = equality_filter(self.schema(), node_type, unique.value())?;

        let nodes = self
            .update_filtered(
                context,
                node_type,
                filter,
                Vec::new(),
                Some(1),
                &args.data,
                "data",
            )
            .await?;
        Ok(nodes.first().map(|node| selection.project(node)))
    }

    pub(crate) async fn update_one_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: UpdateOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        let where_ = args.where_.clone();
        self.update_one_if_exists_in(context, node_type, args)
            .await?
            .ok_or_else(|| NodeServiceError::not_found(node_type.name(), &where_))
    }

    pub(crate) async fn update_many_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: UpdateManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        ensure_mutable(node_type)?;
        let selection = self.selection(node_type, args.selection)?;
        let filter = parse_filter(self.schema(), node_type, &args.where_)?;
        for order_by in &args.order_by {
            order_by.validate(node_type)?;
        }

        let nodes = self
            .update_filtered(
                context,
                node_type,
                filter,
                args.order_by,
                args.first,
                &args.data,
                "data",
            )
            .await?;
        Ok(project_all(&selection, nodes))
    }

    /// Update the matching nodes with one raw update input
    ///
    /// The matching nodes are read first, so nested edge actions never run
    /// when nothing matches. The input is parsed once for every node, unless
    /// a field needs the current node value: then each node is parsed and
    /// updated on its own.
    pub(crate) fn update_filtered<'a>(
        &'a self,
        context: &'a Arc<OperationContext>,
        node_type: &'a NodeType,
        filter: Filter,
        order_by: Vec<OrderBy>,
        limit: Option<usize>,
        data: &'a Value,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Vec<NodeValue>, NodeServiceError>> {
        async move {
            ensure_mutable(node_type)?;
            if !data.is_object() {
                return Err(ValidationError::not_an_object(path, data).into());
            }

            let filter = self.compose(context, node_type, filter)?;
            let currents = self
                .find_composed(
                    context,
                    node_type,
                    filter,
                    order_by.clone(),
                    0,
                    limit.unwrap_or(usize::MAX),
                )
                .await?;
            if currents.is_empty() {
                tracing::debug!("Skipping update on {}: no node matches", node_type.name());
                return Ok(Vec::new());
            }

            if !self
                .field_graph(node_type, MutationKind::Update)
                .needs_current()
            {
                let parsed =
                    parse_mutation(self, context, node_type, MutationKind::Update, data, None, path)
                        .await?;
                let nodes = self
                    .persist_update(context, node_type, currents, order_by, &parsed)
                    .await?;
                return self.finish_update(context, node_type, nodes, &parsed).await;
            }

            let mut updated = Vec::with_capacity(currents.len());
            for current in currents {
                let parsed = parse_mutation(
                    self,
                    context,
                    node_type,
                    MutationKind::Update,
                    data,
                    Some(&current),
                    path,
                )
                .await?;
                let nodes = self
                    .persist_update(context, node_type, vec![current], Vec::new(), &parsed)
                    .await?;
                updated.extend(self.finish_update(context, node_type, nodes, &parsed).await?);
            }
            Ok(updated)
        }
        .boxed()
    }

    /// Write the parsed payload to exactly the given nodes
    async fn persist_update(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        currents: Vec<NodeValue>,
        order_by: Vec<OrderBy>,
        parsed: &ParsedMutation,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        // Only reverse-edge actions: they still apply to every matching node
        if parsed.payload.is_empty() {
            return Ok(currents);
        }

        let identifiers = currents
            .iter()
            .map(|current| self.identifier_filter(node_type, current))
            .collect::<Result<Vec<_>, _>>()?;
        let filter = optimize(self.schema(), node_type, &Filter::or(identifiers))?;

        self.inner
            .connector
            .update(
                context,
                node_type,
                UpdateStatement {
                    filter: non_trivial(filter),
                    order_by,
                    limit: None,
                    patch: parsed.payload.clone(),
                },
            )
            .await
            .map_err(|e| NodeServiceError::connector("update", node_type.name(), e))
    }

    async fn finish_update(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        nodes: Vec<NodeValue>,
        parsed: &ParsedMutation,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        let updated_fields = parsed.updated_fields();
        if updated_fields.is_empty() {
            return Ok(nodes);
        }

        for node in &nodes {
            context.track_change(NodeChange::Updated {
                node_type: node_type.name().to_string(),
                node: node.clone(),
                updated_fields: updated_fields.clone(),
            });
            for actions in &parsed.reverse_edges {
                reverse_edge::apply(self, context, node_type, node, actions).await?;
            }
        }

        match &self.hooks(node_type).lifecycle {
            None => Ok(nodes),
            Some(lifecycle) => {
                let api = BoundApi::new(self.clone(), context.clone());
                for node in &nodes {
                    lifecycle.post_update(&api, node, &updated_fields).await?;
                }
                self.reselect(context, node_type, nodes).await
            }
        }
    }

    pub(crate) async fn delete_one_if_exists_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: DeleteOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        let selection = self.selection(node_type, args.selection)?;
        let unique = resolve_unique(self.schema(), node_type, &args.where_, None, "where")?;
        let filter = equality_filter(self.schema(), node_type, unique.value())?;

        let nodes = self
            .delete_filtered(context, node_type, filter, Vec::new(), Some(1))
            .await?;
        Ok(nodes.first().map(|node| selection.project(node)))
    }

    pub(crate) async fn delete_one_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: DeleteOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        let where_ = args.where_.clone();
        self.delete_one_if_exists_in(context, node_type, args)
            .await?
            .ok_or_else(|| NodeServiceError::not_found(node_type.name(), &where_))
    }

    pub(crate) async fn delete_many_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: DeleteManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        let selection = self.selection(node_type, args.selection)?;
        let filter = parse_filter(self.schema(), node_type, &args.where_)?;
        for order_by in &args.order_by {
            order_by.validate(node_type)?;
        }

        let nodes = self
            .delete_filtered(context, node_type, filter, args.order_by, args.first)
            .await?;
        Ok(project_all(&selection, nodes))
    }

    pub(crate) async fn delete_filtered(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        filter: Filter,
        order_by: Vec<OrderBy>,
        limit: Option<usize>,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        let filter = self.compose(context, node_type, filter)?;
        if filter.is_false() {
            tracing::debug!("Skipping delete on {}: nothing can match", node_type.name());
            return Ok(Vec::new());
        }

        let nodes = self
            .inner
            .connector
            .delete(
                context,
                node_type,
                DeleteStatement {
                    filter: non_trivial(filter),
                    order_by,
                    limit,
                },
            )
            .await
            .map_err(|e| NodeServiceError::connector("delete", node_type.name(), e))?;

        for node in &nodes {
            context.track_change(NodeChange::Deleted {
                node_type: node_type.name().to_string(),
                node: node.clone(),
            });
        }

        if let Some(lifecycle) = &self.hooks(node_type).lifecycle {
            let api = BoundApi::new(self.clone(), context.clone());
            for node in &nodes {
                lifecycle.post_delete(&api, node).await?;
            }
        }
        Ok(nodes)
    }

    pub(crate) async fn upsert_in(
        &self,
        context: &Arc<OperationContext>,
        node_type: &NodeType,
        args: UpsertArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        let existing = self
            .lookup_unique(context, node_type, &args.where_, "where")
            .await?;

        match existing {
            Some(_) => {
                self.update_one_in(
                    context,
                    node_type,
                    UpdateOneArgs {
                        where_: args.where_,
                        data: args.update,
                        selection: args.selection,
                    },
                )
                .await
            }
            None => {
                self.create_one_in(
                    context,
                    node_type,
                    CreateOneArgs {
                        data: args.create,
                        selection: args.selection,
                    },
                )
                .await
            }
        }
    }
}

impl std::fmt::Debug for NodeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeService")
            .field("node_types", &self.inner.schema.len())
            .field("config", &self.inner.config)
            .field("changes", &self.inner.changes)
            .finish()
    }
}

fn ensure_mutable(node_type: &NodeType) -> Result<(), NodeServiceError> {
    if node_type.is_immutable() {
        Err(NodeServiceError::invalid_operation(format!(
            "\"{}\" is immutable",
            node_type.name()
        )))
    } else {
        Ok(())
    }
}

/// Connectors receive `None` rather than a `true` filter
fn non_trivial(filter: Filter) -> Option<Filter> {
    if filter.is_true() {
        None
    } else {
        Some(filter)
    }
}

fn project_all(selection: &Selection, nodes: Vec<NodeValue>) -> Vec<NodeValue> {
    nodes.iter().map(|node| selection.project(node)).collect()
}

#[cfg(test)]
#[path = "node_service_test.rs"]
mod node_service_test;
