//! Business Services
//!
//! This module contains the operation layer:
//!
//! - `NodeService` - the thirteen operations, authorization and the operation lifecycle
//! - `hooks` - per node type authorization, field resolvers, payload and lifecycle hooks
//! - `mutation` - dependency-ordered parsing of creation / update payloads and
//!   reverse-edge actions
//! - `input_shape` - input descriptors for a query-protocol layer
//!
//! Services sit between the schema model and the [`Connector`](crate::db::Connector):
//! they validate, authorize and optimize, then delegate persistence.

pub mod error;
pub mod hooks;
pub mod input_shape;
pub(crate) mod mutation;
pub mod node_service;

pub use error::NodeServiceError;
pub use hooks::{
    Access, AuthorizationFn, FieldArgs, FieldConfig, FieldResolver, NodeLifecycle,
    NodeTypeHooks, PayloadArgs, PayloadHook,
};
pub use input_shape::{InputFieldShape, InputObjectShape, InputType};
pub use mutation::MutationKind;
pub use node_service::NodeService;
