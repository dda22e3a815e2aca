//! Reference-only edge filters
//!
//! An edge stores the value of one of its head's unique constraints. When the
//! inner filter of an edge comparison only mentions components of that
//! constraint, it can be answered from the stored reference alone, without
//! loading the head node.

use super::ast::Filter;
use crate::models::{Edge, Schema};

/// Whether `filter` (scoped to the edge's head) only constrains components of
/// the edge's referenced unique constraint
pub fn is_reference_only(schema: &Schema, edge: &Edge, filter: &Filter) -> bool {
    let unique = edge.referenced_unique(schema);
    let head = schema.node_type(edge.head());

    match filter {
        Filter::Boolean(_) => true,
        Filter::And(operands) | Filter::Or(operands) => operands
            .iter()
            .all(|operand| is_reference_only(schema, edge, operand)),
        Filter::Not(operand) => is_reference_only(schema, edge, operand),
        Filter::Leaf(comparison) => unique.contains(&comparison.leaf),
        Filter::Edge(comparison) => {
            unique.contains(&comparison.edge)
                && head
                    .edge(&comparison.edge)
                    .is_some_and(|nested| is_reference_only(schema, nested, &comparison.filter))
        }
        Filter::ReverseEdge(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{parse_filter, EdgeOperator};
    use crate::test_support::blog_schema;
    use serde_json::json;

    #[test]
    fn test_reference_only_filters() {
        let schema = blog_schema();
        let article = schema.node_type_by_name("Article").unwrap();
        let category = schema.node_type_by_name("Category").unwrap();
        let edge = article.edge("category").unwrap();

        let by_id = parse_filter(&schema, category, &json!({ "_id_in": [] })).unwrap();
        assert!(is_reference_only(&schema, edge, &by_id));

        let by_slug = parse_filter(&schema, category, &json!({ "slug": "news" })).unwrap();
        assert!(!is_reference_only(&schema, edge, &by_slug));

        let nested = Filter::edge("parent", EdgeOperator::Eq, Filter::TRUE);
        assert!(!is_reference_only(&schema, edge, &nested));

        let mixed = parse_filter(
            &schema,
            category,
            &json!({ "OR": [{ "_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8" }, { "NOT": {} }] }),
        )
        .unwrap();
        assert!(is_reference_only(&schema, edge, &mixed));
    }

    #[test]
    fn test_nested_reference_through_composite_constraint() {
        let schema = blog_schema();
        let extension = schema.node_type_by_name("ArticleExtension").unwrap();
        let article = schema.node_type_by_name("Article").unwrap();
        // ArticleExtension.article references Article's identifier [_id]
        let edge = extension.edge("article").unwrap();

        let filter = parse_filter(&schema, article, &json!({ "category": { "_id": null } })).unwrap();
        assert!(!is_reference_only(&schema, edge, &filter));
    }
}
