//! Shared unit-test fixtures

use crate::models::{Schema, SchemaDefinition};
use serde_json::{json, Value};
use std::sync::Arc;

pub(crate) fn blog_definition() -> Value {
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
                    { "kind": "leaf", "name": "created_at", "type": "date_time" },
                    { "kind": "leaf", "name": "metadata", "type": "json", "nullable": true }
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
            }
        ]
    })
}

pub(crate) fn blog_schema() -> Arc<Schema> {
    let definition: SchemaDefinition = serde_json::from_value(blog_definition()).unwrap();
    Arc::new(Schema::new(definition).unwrap())
}
