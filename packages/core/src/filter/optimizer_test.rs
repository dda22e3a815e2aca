//! Tests for the filter optimizer

#[cfg(test)]
mod tests {
    use crate::filter::{
        optimize, parse_filter, EdgeOperator, Filter, FilterError, LeafOperator,
        ReverseEdgeOperator,
    };
    use crate::models::Schema;
    use crate::test_support::blog_schema;
    use serde_json::{json, Value};

    fn optimized(schema: &Schema, node_type: &str, input: Value) -> Filter {
        let node_type = schema.node_type_by_name(node_type).unwrap();
        let filter = parse_filter(schema, node_type, &input).unwrap();
        optimize(schema, node_type, &filter).unwrap()
    }

    #[test]
    fn test_boolean_laws() {
        let schema = blog_schema();

        assert_eq!(
            optimized(&schema, "Category", json!({ "OR": [{ "id": 5 }, { "id_not": 5 }] })),
            Filter::TRUE
        );
        assert_eq!(
            optimized(&schema, "Category", json!({ "AND": [{ "id": 5 }, { "id_not": 5 }] })),
            Filter::FALSE
        );
        assert_eq!(optimized(&schema, "Category", json!({ "AND": [] })), Filter::TRUE);
        assert_eq!(optimized(&schema, "Category", json!({ "OR": [] })), Filter::FALSE);
        assert_eq!(
            optimized(&schema, "Category", json!({ "NOT": { "NOT": {} } })),
            Filter::TRUE
        );
        assert_eq!(optimized(&schema, "Category", json!({ "NOT": {} })), Filter::FALSE);
        assert_eq!(optimized(&schema, "Category", Value::Null), Filter::TRUE);
    }

    #[test]
    fn test_identity_annihilator_and_flattening() {
        let schema = blog_schema();
        let category = schema.node_type_by_name("Category").unwrap();

        let a = Filter::eq("slug", json!("a"));
        let b = Filter::eq("order", json!(1));
        let c = Filter::eq("title", json!("c"));

        let nested = Filter::and([
            Filter::TRUE,
            Filter::and([a.clone(), Filter::and([b.clone(), a.clone()])]),
            c.clone(),
        ]);
        assert_eq!(
            optimize(&schema, category, &nested).unwrap(),
            Filter::And(vec![a.clone(), b.clone(), c.clone()])
        );

        let annihilated = Filter::and([a.clone(), Filter::or([Filter::FALSE]), b.clone()]);
        assert_eq!(optimize(&schema, category, &annihilated).unwrap(), Filter::FALSE);

        let single = Filter::or([Filter::FALSE, Filter::or([a.clone()])]);
        assert_eq!(optimize(&schema, category, &single).unwrap(), a);

        let absorbed = Filter::or([a.clone(), Filter::TRUE]);
        assert_eq!(optimize(&schema, category, &absorbed).unwrap(), Filter::TRUE);
    }

    #[test]
    fn test_in_collapsing() {
        let schema = blog_schema();

        assert_eq!(
            optimized(&schema, "Category", json!({ "id_in": [3, 3, 3] })),
            Filter::eq("id", json!(3))
        );
        assert_eq!(optimized(&schema, "Category", json!({ "id_in": [] })), Filter::FALSE);
        assert_eq!(
            optimized(&schema, "Category", json!({ "id_not_in": [] })),
            Filter::TRUE
        );
        // Null can never match a non-nullable leaf
        assert_eq!(
            optimized(&schema, "Category", json!({ "id_in": [1, null, 1.0] })),
            Filter::eq("id", json!(1))
        );
        assert_eq!(
            optimized(&schema, "Article", json!({ "views_in": [null, 2, 3] })),
            Filter::leaf("views", LeafOperator::In, json!([null, 2, 3]))
        );
        assert_eq!(
            optimized(&schema, "Category", json!({ "id_not_in": [4, 5] })),
            Filter::leaf("id", LeafOperator::In, json!([4, 5])).negate()
        );
    }

    #[test]
    fn test_leaf_normalization() {
        let schema = blog_schema();

        assert_eq!(optimized(&schema, "Category", json!({ "id": null })), Filter::FALSE);
        assert_eq!(
            optimized(&schema, "Article", json!({ "views": null })),
            Filter::eq("views", Value::Null)
        );
        assert_eq!(
            optimized(&schema, "Article", json!({ "views_is_null": false })),
            Filter::eq("views", Value::Null).negate()
        );
        assert_eq!(
            optimized(&schema, "Article", json!({ "views_gt": null })),
            Filter::FALSE
        );
        assert_eq!(
            optimized(&schema, "Article", json!({ "created_at_gte": "2024-03-01T10:00:00+02:00" })),
            Filter::leaf("created_at", LeafOperator::Gte, json!("2024-03-01T08:00:00.000Z"))
        );
    }

    #[test]
    fn test_edge_narrowing() {
        let schema = blog_schema();

        // ArticleTag.article is not nullable: it always exists
        assert_eq!(
            optimized(&schema, "ArticleTag", json!({ "article_not": {} })),
            Filter::FALSE
        );
        assert_eq!(
            optimized(&schema, "ArticleTag", json!({ "article": {} })),
            Filter::TRUE
        );
        assert_eq!(
            optimized(&schema, "ArticleTag", json!({ "article": { "slug_in": [] } })),
            Filter::FALSE
        );

        // Category.parent is nullable: "has a parent" stays
        assert_eq!(
            optimized(&schema, "Category", json!({ "parent": {} })),
            Filter::edge("parent", EdgeOperator::Eq, Filter::TRUE)
        );
        assert_eq!(
            optimized(&schema, "Category", json!({ "parent_is_null": true })),
            Filter::edge("parent", EdgeOperator::Eq, Filter::TRUE).negate()
        );
        assert_eq!(
            optimized(&schema, "Category", json!({ "parent_not": { "slug": "root" } })),
            Filter::edge(
                "parent",
                EdgeOperator::Eq,
                Filter::eq("slug", json!("root")).negate()
            )
        );
    }

    #[test]
    fn test_reverse_edge_normalization() {
        let schema = blog_schema();

        assert_eq!(
            optimized(&schema, "Category", json!({ "children_every": { "order_gt": 0 } })),
            Filter::reverse_edge(
                "children",
                ReverseEdgeOperator::Some,
                Filter::leaf("order", LeafOperator::Gt, json!(0)).negate()
            )
            .negate()
        );
        assert_eq!(
            optimized(&schema, "Category", json!({ "children_none": {} })),
            Filter::reverse_edge("children", ReverseEdgeOperator::Some, Filter::TRUE).negate()
        );
        assert_eq!(
            optimized(&schema, "Category", json!({ "children_some": { "id_in": [] } })),
            Filter::FALSE
        );
        assert_eq!(
            optimized(&schema, "Category", json!({ "children_every": { "id_in": [] } })),
            Filter::reverse_edge("children", ReverseEdgeOperator::Some, Filter::TRUE).negate()
        );

        assert_eq!(
            optimized(&schema, "Article", json!({ "extension": null })),
            Filter::reverse_edge("extension", ReverseEdgeOperator::Eq, Filter::TRUE).negate()
        );
        assert_eq!(
            optimized(&schema, "Article", json!({ "extension_not": { "source": "x" } })),
            Filter::reverse_edge(
                "extension",
                ReverseEdgeOperator::Eq,
                Filter::eq("source", json!("x")).negate()
            )
        );
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let schema = blog_schema();
        let category = schema.node_type_by_name("Category").unwrap();
        let article = schema.node_type_by_name("Article").unwrap();

        let err = optimize(&schema, category, &Filter::eq("name", json!("x"))).unwrap_err();
        assert_eq!(err, FilterError::unknown_leaf("Category", "name"));

        let err = optimize(
            &schema,
            category,
            &Filter::edge("slug", EdgeOperator::Eq, Filter::TRUE),
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::UnknownEdge { .. }));

        // Nested scopes are checked as well
        let nested = Filter::edge("parent", EdgeOperator::Eq, Filter::eq("status", json!("DRAFT")));
        assert!(matches!(
            optimize(&schema, category, &nested),
            Err(FilterError::UnknownLeaf { .. })
        ));

        let unique_some =
            Filter::reverse_edge("extension", ReverseEdgeOperator::Some, Filter::TRUE);
        assert!(matches!(
            optimize(&schema, article, &unique_some),
            Err(FilterError::InvalidOperator { .. })
        ));

        let ordered_enum = Filter::leaf("status", LeafOperator::Gt, json!("DRAFT"));
        assert!(matches!(
            optimize(&schema, article, &ordered_enum),
            Err(FilterError::InvalidOperator { .. })
        ));

        let bad_value = Filter::eq("status", json!("ARCHIVED"));
        assert!(matches!(
            optimize(&schema, article, &bad_value),
            Err(FilterError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_idempotence() {
        let schema = blog_schema();
        let inputs = [
            ("Category", json!({ "OR": [{ "slug": "a" }, { "NOT": { "slug_not": "b" } }], "order_lt": 3 })),
            ("Category", json!({ "children_every": { "NOT": { "parent": null } }, "id_not_in": [1, 2, 2] })),
            ("Category", json!({ "AND": [{ "OR": [{ "id": 1 }, { "id": 2 }] }, { "OR": [{ "id": 2 }, { "id": 1 }] }] })),
            ("Article", json!({ "category": { "parent": { "slug": "root" } }, "tags_some": { "tag": { "name_in": ["rust"] } } })),
            ("Article", json!({ "extension_not": null, "views_not_in": [null], "NOT": { "title": "x", "NOT": { "slug": "y" } } })),
        ];

        for (node_type, input) in inputs {
            let node_type = schema.node_type_by_name(node_type).unwrap();
            let filter = parse_filter(&schema, node_type, &input).unwrap();
            let once = optimize(&schema, node_type, &filter).unwrap();
            let twice = optimize(&schema, node_type, &once).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }
}
