//! Node-type hooks
//!
//! Behavior that cannot be declared in a [`SchemaDefinition`](crate::models::SchemaDefinition)
//! is attached per node type with [`NodeTypeHooks`]:
//!
//! - **authorization**: a per-request filter AND-ed into every read, update and
//!   delete on the node type
//! - **field configs**: per creation / update field, the fields it depends on,
//!   whether it needs the current node value, and a resolver transforming the
//!   raw input before it is parsed
//! - **post-parse hooks**: transform the whole parsed payload
//! - **lifecycle**: run after nodes are created, updated or deleted, inside the
//!   same operation

use crate::models::NodeValue;
use crate::operations::{BoundApi, RequestContext};
use crate::services::NodeServiceError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result of an authorization hook
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// No restriction
    Granted,
    /// Nothing is visible; creation is forbidden
    Denied,
    /// Only nodes matching this client-shaped filter are visible
    Filtered(Value),
}

impl From<bool> for Access {
    fn from(granted: bool) -> Self {
        if granted {
            Access::Granted
        } else {
            Access::Denied
        }
    }
}

/// Authorization hook
pub type AuthorizationFn = Arc<dyn Fn(&RequestContext) -> Access + Send + Sync>;

/// Arguments given to a [`FieldResolver`]
pub struct FieldArgs<'a> {
    pub field: &'a str,
    /// Raw input, `None` when the key is absent
    pub value: Option<&'a Value>,
    /// Parsed values of the declared dependencies that are present
    pub dependencies: &'a NodeValue,
    /// Current node value, for update fields declaring `needs_current`
    pub current: Option<&'a NodeValue>,
    pub api: &'a BoundApi,
    pub path: &'a str,
}

impl<'a> FieldArgs<'a> {
    pub fn request(&self) -> &RequestContext {
        self.api.request()
    }

    pub fn dependency(&self, name: &str) -> Option<&Value> {
        self.dependencies.get(name)
    }
}

/// Transforms a field's raw input before it is parsed
///
/// Returning `None` leaves the field absent.
#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve(&self, args: FieldArgs<'_>) -> Result<Option<Value>, NodeServiceError>;
}

struct FnResolver<F>(F);

#[async_trait]
impl<F> FieldResolver for FnResolver<F>
where
    F: Fn(FieldArgs<'_>) -> Result<Option<Value>, NodeServiceError> + Send + Sync,
{
    async fn resolve(&self, args: FieldArgs<'_>) -> Result<Option<Value>, NodeServiceError> {
        (self.0)(args)
    }
}

/// Configuration of one creation or update field
#[derive(Clone, Default)]
pub struct FieldConfig {
    pub(crate) depends_on: Vec<String>,
    pub(crate) needs_current: bool,
    pub(crate) resolver: Option<Arc<dyn FieldResolver>>,
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields whose parsed value the resolver reads
    pub fn depends_on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Load the current node value before resolving (update only)
    pub fn needs_current(mut self) -> Self {
        self.needs_current = true;
        self
    }

    pub fn resolver(mut self, resolver: impl FieldResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Synchronous resolver
    pub fn resolve_with<F>(self, resolver: F) -> Self
    where
        F: Fn(FieldArgs<'_>) -> Result<Option<Value>, NodeServiceError> + Send + Sync + 'static,
    {
        self.resolver(FnResolver(resolver))
    }
}

impl fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("depends_on", &self.depends_on)
            .field("needs_current", &self.needs_current)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Arguments given to a [`PayloadHook`]
pub struct PayloadArgs<'a> {
    /// Parsed components
    pub payload: NodeValue,
    pub current: Option<&'a NodeValue>,
    pub api: &'a BoundApi,
    pub path: &'a str,
}

/// Transforms the parsed payload of a creation or update
///
/// The result is checked again: only writable components, and no null for a
/// non-nullable one.
#[async_trait]
pub trait PayloadHook: Send + Sync {
    async fn parse(&self, args: PayloadArgs<'_>) -> Result<NodeValue, NodeServiceError>;
}

struct FnPayloadHook<F>(F);

#[async_trait]
impl<F> PayloadHook for FnPayloadHook<F>
where
    F: Fn(PayloadArgs<'_>) -> Result<NodeValue, NodeServiceError> + Send + Sync,
{
    async fn parse(&self, args: PayloadArgs<'_>) -> Result<NodeValue, NodeServiceError> {
        (self.0)(args)
    }
}

/// Runs after persisted changes, inside the operation
#[async_trait]
pub trait NodeLifecycle: Send + Sync {
    async fn post_create(&self, _api: &BoundApi, _node: &NodeValue) -> Result<(), NodeServiceError> {
        Ok(())
    }

    async fn post_update(
        &self,
        _api: &BoundApi,
        _node: &NodeValue,
        _updated_fields: &[String],
    ) -> Result<(), NodeServiceError> {
        Ok(())
    }

    async fn post_delete(&self, _api: &BoundApi, _node: &NodeValue) -> Result<(), NodeServiceError> {
        Ok(())
    }
}

/// Hooks of one node type
#[derive(Clone, Default)]
pub struct NodeTypeHooks {
    pub(crate) authorization: Option<AuthorizationFn>,
    pub(crate) creation: HashMap<String, FieldConfig>,
    pub(crate) update: HashMap<String, FieldConfig>,
    pub(crate) post_creation_parse: Option<Arc<dyn PayloadHook>>,
    pub(crate) post_update_parse: Option<Arc<dyn PayloadHook>>,
    pub(crate) lifecycle: Option<Arc<dyn NodeLifecycle>>,
}

impl NodeTypeHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authorization<F>(mut self, authorization: F) -> Self
    where
        F: Fn(&RequestContext) -> Access + Send + Sync + 'static,
    {
        self.authorization = Some(Arc::new(authorization));
        self
    }

    pub fn creation_field(mut self, field: impl Into<String>, config: FieldConfig) -> Self {
        self.creation.insert(field.into(), config);
        self
    }

    pub fn update_field(mut self, field: impl Into<String>, config: FieldConfig) -> Self {
        self.update.insert(field.into(), config);
        self
    }

    pub fn post_creation_parse(mut self, hook: impl PayloadHook + 'static) -> Self {
        self.post_creation_parse = Some(Arc::new(hook));
        self
    }

    pub fn post_creation_parse_with<F>(self, hook: F) -> Self
    where
        F: Fn(PayloadArgs<'_>) -> Result<NodeValue, NodeServiceError> + Send + Sync + 'static,
    {
        self.post_creation_parse(FnPayloadHook(hook))
    }

    pub fn post_update_parse(mut self, hook: impl PayloadHook + 'static) -> Self {
        self.post_update_parse = Some(Arc::new(hook));
        self
    }

    pub fn post_update_parse_with<F>(self, hook: F) -> Self
    where
        F: Fn(PayloadArgs<'_>) -> Result<NodeValue, NodeServiceError> + Send + Sync + 'static,
    {
        self.post_update_parse(FnPayloadHook(hook))
    }

    pub fn lifecycle(mut self, lifecycle: impl NodeLifecycle + 'static) -> Self {
        self.lifecycle = Some(Arc::new(lifecycle));
        self
    }
}

impl fmt::Debug for NodeTypeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTypeHooks")
            .field("authorization", &self.authorization.is_some())
            .field("creation", &self.creation)
            .field("update", &self.update)
            .field("post_creation_parse", &self.post_creation_parse.is_some())
            .field("post_update_parse", &self.post_update_parse.is_some())
            .field("lifecycle", &self.lifecycle.is_some())
            .finish()
    }
}
