use super::*;
use crate::services::hooks::FieldConfig;
use crate::test_support::blog_schema;
use serde_json::json;
use std::collections::HashMap;

fn graph(node_type: &NodeType, kind: MutationKind, configs: HashMap<String, FieldConfig>) -> FieldGraph {
    FieldGraph::build(node_type, kind, &configs).unwrap()
}

#[test]
fn test_where_input_operators() {
    let schema = blog_schema();
    let article = schema.node_type_by_name("Article").unwrap();
    let shape = where_input_shape(&schema, article);

    assert_eq!(shape.name, "ArticleWhereInput");
    assert_eq!(&shape.field_names()[..3], &["AND", "OR", "NOT"]);

    // Orderable leaves get comparison operators, json does not
    assert!(shape.field("views_gte").is_some());
    assert!(shape.field("metadata_gt").is_none());
    assert!(shape.field("metadata_is_null").is_some());
    assert_eq!(
        shape.field("status_in").unwrap().input_type,
        InputType::List {
            of: Box::new(InputType::Scalar {
                leaf_type: "enum".to_string()
            })
        }
    );

    // Edge and reverse edges
    assert_eq!(
        shape.field("category_not").unwrap().input_type,
        InputType::Object {
            name: "CategoryWhereInput".to_string()
        }
    );
    assert!(shape.field("tags_some").is_some());
    assert!(shape.field("tags").is_none());
    assert!(shape.field("extension").is_some());
    assert!(shape.field("extension_is_null").is_some());
    assert!(shape.field("extension_every").is_none());
}

#[test]
fn test_where_unique_input_lists_constraint_components() {
    let schema = blog_schema();
    let category = schema.node_type_by_name("Category").unwrap();
    let shape = where_unique_input_shape(&schema, category);

    assert_eq!(shape.field_names(), vec!["_id", "id", "parent", "slug", "order"]);
    assert_eq!(
        shape.field("parent").unwrap().input_type,
        InputType::Object {
            name: "CategoryWhereUniqueInput".to_string()
        }
    );
    assert!(shape.fields.iter().all(|field| !field.required));
}

#[test]
fn test_creation_input_required_fields() {
    let schema = blog_schema();
    let category = schema.node_type_by_name("Category").unwrap();

    let mut configs = HashMap::new();
    configs.insert(
        "slug".to_string(),
        FieldConfig::new()
            .depends_on(["title"])
            .resolve_with(|args| Ok(args.value.cloned())),
    );
    let shape = mutation_input_shape(
        &schema,
        category,
        &graph(category, MutationKind::Creation, configs),
    );

    assert_eq!(shape.name, "CategoryCreationInput");
    let required: Vec<&str> = shape
        .fields
        .iter()
        .filter(|field| field.required)
        .map(|field| field.name.as_str())
        .collect();
    assert_eq!(required, vec!["_id", "id", "title", "order"]);

    let Some(InputType::Actions { shape: parent }) =
        shape.field("parent").map(|field| field.input_type.clone())
    else {
        panic!("parent should take an action object");
    };
    assert_eq!(parent.name, "CategoryParentCreationInput");
    assert_eq!(parent.field_names(), vec!["connect", "connectIfExists", "create"]);

    let Some(InputType::Actions { shape: children }) =
        shape.field("children").map(|field| field.input_type.clone())
    else {
        panic!("children should take an action object");
    };
    assert_eq!(children.field_names(), vec!["connect", "connectMany", "create"]);
}

#[test]
fn test_update_input_actions() {
    let schema = blog_schema();
    let article = schema.node_type_by_name("Article").unwrap();
    let shape = mutation_input_shape(
        &schema,
        article,
        &graph(article, MutationKind::Update, HashMap::new()),
    );

    assert_eq!(shape.name, "ArticleUpdateInput");
    assert!(shape.field("_id").is_none());
    assert!(shape.fields.iter().all(|field| !field.required));

    // ArticleTag.article is immutable: no connect nor disconnect
    let Some(InputType::Actions { shape: tags }) =
        shape.field("tags").map(|field| field.input_type.clone())
    else {
        panic!("tags should take an action object");
    };
    assert_eq!(tags.field_names(), vec!["delete", "deleteMany", "create"]);

    let Some(InputType::Actions { shape: extension }) =
        shape.field("extension").map(|field| field.input_type.clone())
    else {
        panic!("extension should take an action object");
    };
    assert_eq!(extension.field_names(), vec!["delete", "create"]);
}

#[test]
fn test_shape_serialization() {
    let schema = blog_schema();
    let tag = schema.node_type_by_name("Tag").unwrap();
    let shape = where_unique_input_shape(&schema, tag);

    assert_eq!(
        serde_json::to_value(&shape).unwrap(),
        json!({
            "name": "TagWhereUniqueInput",
            "fields": [
                { "name": "_id", "type": { "kind": "scalar", "leaf_type": "uuid" }, "required": false },
                { "name": "name", "type": { "kind": "scalar", "leaf_type": "non_empty_string" }, "required": false }
            ]
        })
    );
}
