//! Shared integration-test fixture
//!
//! A blog schema (categories, articles, tags and users) over a [`MemoryStore`],
//! with the field resolvers a real deployment would register: generated
//! identifiers, derived slugs, default parent category and hashed passwords.

#![allow(dead_code)]

use anyhow::Result;
use nodegraph_core::utils::slugify;
use nodegraph_core::{
    Access, CreateOneArgs, EngineConfig, FieldConfig, MemoryStore, NodeService, NodeServiceError,
    NodeTypeHooks, NodeValue, RequestContext, Schema, SchemaDefinition,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub fn definition() -> Value {
    json!({
        "node_types": [
            {
                "name": "Category",
                "plural": "Categories",
                "components": [
                    { "kind": "leaf", "name": "_id", "type": "uuid", "immutable": true },
                    { "kind": "leaf", "name": "id", "type": "int", "immutable": true },
                    { "kind": "edge", "name": "parent", "head": "Category", "nullable": true },
                    { "kind": "leaf", "name": "title", "type": "non_empty_string" },
                    { "kind": "leaf", "name": "slug", "type": "non_empty_string" },
                    { "kind": "leaf", "name": "order", "type": "int" }
                ],
                "unique": [
                    { "components": ["_id"] },
                    { "components": ["id"] },
                    { "components": ["parent", "slug"] },
                    { "components": ["parent", "order"] }
                ],
                "reverse_edges": [
                    { "name": "children", "original_edge": "Category.parent" },
                    { "name": "articles", "original_edge": "Article.category" }
                ]
            },
            {
                "name": "Article",
                "components": [
                    { "kind": "leaf", "name": "_id", "type": "uuid", "immutable": true },
                    { "kind": "edge", "name": "category", "head": "Category", "nullable": true },
                    { "kind": "leaf", "name": "title", "type": "non_empty_string" },
                    { "kind": "leaf", "name": "slug", "type": "non_empty_string" },
                    { "kind": "leaf", "name": "status", "type": { "enum": ["DRAFT", "PUBLISHED"] } },
                    { "kind": "leaf", "name": "views", "type": "int", "nullable": true },
                    { "kind": "leaf", "name": "created_at", "type": "date_time" }
                ],
                "unique": [
                    { "components": ["_id"] },
                    { "components": ["category", "slug"] }
                ],
                "reverse_edges": [
                    { "name": "tags", "original_edge": "ArticleTag.article" },
                    { "name": "extension", "original_edge": "ArticleExtension.article" }
                ]
            },
            {
                "name": "Tag",
                "components": [
                    { "kind": "leaf", "name": "_id", "type": "uuid", "immutable": true },
                    { "kind": "leaf", "name": "name", "type": "non_empty_string" }
                ],
                "unique": [
                    { "components": ["_id"] },
                    { "components": ["name"] }
                ],
                "reverse_edges": [
                    { "name": "articles", "original_edge": "ArticleTag.tag" }
                ]
            },
            {
                "name": "ArticleTag",
                "components": [
                    { "kind": "leaf", "name": "_id", "type": "uuid", "immutable": true },
                    { "kind": "edge", "name": "article", "head": "Article", "immutable": true },
                    { "kind": "edge", "name": "tag", "head": "Tag", "immutable": true },
                    { "kind": "leaf", "name": "order", "type": "int", "nullable": true }
                ],
                "unique": [
                    { "components": ["_id"] },
                    { "components": ["article", "tag"] }
                ]
            },
            {
                "name": "ArticleExtension",
                "components": [
                    { "kind": "edge", "name": "article", "head": "Article", "immutable": true },
                    { "kind": "leaf", "name": "source", "type": "string", "nullable": true }
                ],
                "unique": [ { "components": ["article"] } ]
            },
            {
                "name": "User",
                "components": [
                    { "kind": "leaf", "name": "_id", "type": "uuid", "immutable": true },
                    { "kind": "leaf", "name": "username", "type": "non_empty_string" },
                    { "kind": "leaf", "name": "role", "type": { "enum": ["ADMIN", "MEMBER"] } },
                    { "kind": "leaf", "name": "password_hash", "type": "string", "public": false }
                ],
                "unique": [
                    { "components": ["_id"] },
                    { "components": ["username"] }
                ],
                "virtual_fields": [
                    { "name": "password", "type": "non_empty_string" }
                ]
            }
        ]
    })
}

pub fn schema() -> Result<Arc<Schema>> {
    let definition: SchemaDefinition = serde_json::from_value(definition())?;
    Ok(Arc::new(Schema::new(definition)?))
}

pub fn admin() -> RequestContext {
    RequestContext::for_subject("admin").with_role("admin")
}

/// Path of the validation error under any field wrappers
pub fn validation_path(error: &NodeServiceError) -> Option<&str> {
    match error.root_cause() {
        NodeServiceError::Validation(e) => Some(e.path()),
        _ => None,
    }
}

/// Keep the raw value, or use `default()` when the key is absent
pub fn default_to<F>(default: F) -> FieldConfig
where
    F: Fn() -> Value + Send + Sync + 'static,
{
    FieldConfig::new().resolve_with(move |args| Ok(Some(args.value.cloned().unwrap_or_else(&default))))
}

/// Keep the raw value, or slugify the parsed `title`
pub fn slug_from_title() -> FieldConfig {
    FieldConfig::new().depends_on(["title"]).resolve_with(|args| {
        if let Some(value) = args.value {
            return Ok(Some(value.clone()));
        }
        Ok(args
            .dependency("title")
            .and_then(Value::as_str)
            .map(|title| json!(slugify(title))))
    })
}

fn new_uuid() -> FieldConfig {
    default_to(|| json!(Uuid::new_v4().to_string()))
}

pub fn hooks() -> HashMap<String, NodeTypeHooks> {
    let ids = Arc::new(AtomicI64::new(1));

    let category = NodeTypeHooks::new()
        .creation_field("_id", new_uuid())
        .creation_field(
            "id",
            default_to(move || json!(ids.fetch_add(1, Ordering::SeqCst))),
        )
        .creation_field(
            "parent",
            default_to(|| json!({ "connect": { "parent": null, "slug": "root" } })),
        )
        .creation_field("slug", slug_from_title());

    let article = NodeTypeHooks::new()
        .authorization(|request| {
            if request.has_role("admin") {
                Access::Granted
            } else {
                Access::Filtered(json!({ "status": "PUBLISHED" }))
            }
        })
        .creation_field("_id", new_uuid())
        .creation_field("slug", slug_from_title())
        .creation_field("status", default_to(|| json!("DRAFT")))
        .creation_field(
            "created_at",
            default_to(|| json!(chrono::Utc::now().to_rfc3339())),
        );

    let user = NodeTypeHooks::new()
        .authorization(|request| match &request.subject {
            _ if request.has_role("admin") => Access::Granted,
            Some(subject) => Access::Filtered(json!({ "username": subject })),
            None => Access::Denied,
        })
        .creation_field("_id", new_uuid())
        .creation_field(
            "password_hash",
            FieldConfig::new().depends_on(["password"]).resolve_with(|args| {
                Ok(args
                    .dependency("password")
                    .and_then(Value::as_str)
                    .map(|password| json!(format!("hashed:{}", password.len()))))
            }),
        );

    HashMap::from([
        ("Category".to_string(), category),
        ("Article".to_string(), article),
        ("Tag".to_string(), NodeTypeHooks::new().creation_field("_id", new_uuid())),
        ("ArticleTag".to_string(), NodeTypeHooks::new().creation_field("_id", new_uuid())),
        ("User".to_string(), user),
    ])
}

pub struct Fixture {
    pub service: NodeService,
    pub store: Arc<MemoryStore>,
    /// The root category every category defaults to
    pub root: NodeValue,
}

impl Fixture {
    pub async fn create(&self, node_type: &str, data: Value) -> Result<NodeValue> {
        Ok(self
            .service
            .create_one(&admin(), node_type, CreateOneArgs::new(data))
            .await?)
    }
}

/// Build a fixture with the given hooks, then seed the root category
pub async fn build(hooks: HashMap<String, NodeTypeHooks>) -> Result<Fixture> {
    let schema = schema()?;
    let store = Arc::new(MemoryStore::new(schema.clone()));
    let service = NodeService::new(schema, store.clone(), hooks, EngineConfig::default())?;

    let root = service
        .create_one(
            &admin(),
            "Category",
            CreateOneArgs::new(json!({ "parent": null, "title": "Root", "order": 0 })),
        )
        .await?;
    store.reset_calls();

    Ok(Fixture {
        service,
        store,
        root,
    })
}

pub async fn fixture() -> Result<Fixture> {
    build(hooks()).await
}
