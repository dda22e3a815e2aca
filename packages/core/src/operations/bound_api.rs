//! API bound to one operation
//!
//! Resolvers, payload hooks and lifecycle hooks receive a [`BoundApi`]: every
//! call made through it joins the outer operation (same request, same
//! memoized authorizations, same change queue, one set of connector lifecycle
//! hooks). Once the outer operation is over the handle is revoked and every
//! call fails with [`NodeServiceError::Revoked`].

use super::{
    CountArgs, CreateManyArgs, CreateOneArgs, DeleteManyArgs, DeleteOneArgs, FindManyArgs,
    GetOneArgs, OperationContext, RequestContext, UpdateManyArgs, UpdateOneArgs, UpsertArgs,
};
use crate::models::NodeValue;
use crate::services::{NodeService, NodeServiceError};
use std::sync::Arc;

#[derive(Clone)]
pub struct BoundApi {
    service: NodeService,
    context: Arc<OperationContext>,
}

impl BoundApi {
    pub(crate) fn new(service: NodeService, context: Arc<OperationContext>) -> Self {
        Self { service, context }
    }

    pub fn context(&self) -> &OperationContext {
        &self.context
    }

    pub(crate) fn shared_context(&self) -> &Arc<OperationContext> {
        &self.context
    }

    pub fn request(&self) -> &RequestContext {
        self.context.request()
    }

    pub fn is_revoked(&self) -> bool {
        self.context.is_revoked()
    }

    pub async fn find_many(
        &self,
        node_type: &str,
        args: FindManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.find_many_in(&self.context, node_type, args).await
    }

    pub async fn count(&self, node_type: &str, args: CountArgs) -> Result<u64, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.count_in(&self.context, node_type, args).await
    }

    pub async fn get_one(
        &self,
        node_type: &str,
        args: GetOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.get_one_in(&self.context, node_type, args).await
    }

    pub async fn get_one_if_exists(
        &self,
        node_type: &str,
        args: GetOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service
            .get_one_if_exists_in(&self.context, node_type, args)
            .await
    }

    pub async fn create_one(
        &self,
        node_type: &str,
        args: CreateOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.create_one_in(&self.context, node_type, args).await
    }

    pub async fn create_many(
        &self,
        node_type: &str,
        args: CreateManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.create_many_args_in(&self.context, node_type, args).await
    }

    pub async fn update_one(
        &self,
        node_type: &str,
        args: UpdateOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.update_one_in(&self.context, node_type, args).await
    }

    pub async fn update_one_if_exists(
        &self,
        node_type: &str,
        args: UpdateOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service
            .update_one_if_exists_in(&self.context, node_type, args)
            .await
    }

    pub async fn update_many(
        &self,
        node_type: &str,
        args: UpdateManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.update_many_in(&self.context, node_type, args).await
    }

    pub async fn delete_one(
        &self,
        node_type: &str,
        args: DeleteOneArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.delete_one_in(&self.context, node_type, args).await
    }

    pub async fn delete_one_if_exists(
        &self,
        node_type: &str,
        args: DeleteOneArgs,
    ) -> Result<Option<NodeValue>, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service
            .delete_one_if_exists_in(&self.context, node_type, args)
            .await
    }

    pub async fn delete_many(
        &self,
        node_type: &str,
        args: DeleteManyArgs,
    ) -> Result<Vec<NodeValue>, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.delete_many_in(&self.context, node_type, args).await
    }

    pub async fn upsert(
        &self,
        node_type: &str,
        args: UpsertArgs,
    ) -> Result<NodeValue, NodeServiceError> {
        self.context.ensure_live()?;
        let node_type = self.service.node_type_named(node_type)?;
        self.service.upsert_in(&self.context, node_type, args).await
    }
}

impl std::fmt::Debug for BoundApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundApi")
            .field("operation", &self.context.id())
            .field("revoked", &self.context.is_revoked())
            .finish()
    }
}
