//! Connector lifecycle hooks, node lifecycle hooks and change dispatch

mod common;

#[cfg(test)]
mod operation_lifecycle_tests {
    use crate::common::{admin, build, fixture, hooks};
    use anyhow::Result;
    use async_trait::async_trait;
    use nodegraph_core::{
        BoundApi, CreateOneArgs, DeleteManyArgs, DeleteOneArgs, FindManyArgs, NodeChange,
        NodeLifecycle, NodeServiceError, NodeTypeHooks, NodeValue, UpdateOneArgs, UpsertArgs,
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::time::{timeout, Duration};

    /// Every new article starts with zero views and an empty extension
    struct ArticleDefaults;

    #[async_trait]
    impl NodeLifecycle for ArticleDefaults {
        async fn post_create(&self, api: &BoundApi, node: &NodeValue) -> Result<(), NodeServiceError> {
            let reference = json!({ "_id": node["_id"] });
            api.update_one(
                "Article",
                UpdateOneArgs::new(reference.clone(), json!({ "views": 0 })),
            )
            .await?;
            api.create_one(
                "ArticleExtension",
                CreateOneArgs::new(json!({ "article": { "connect": reference } })),
            )
            .await?;
            Ok(())
        }
    }

    /// Refuses to delete the tag named "keep"
    struct ProtectedTags;

    #[async_trait]
    impl NodeLifecycle for ProtectedTags {
        async fn post_delete(&self, _api: &BoundApi, node: &NodeValue) -> Result<(), NodeServiceError> {
            if node.get("name") == Some(&json!("keep")) {
                return Err(NodeServiceError::hook("post_delete", "\"keep\" is protected"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_one_set_of_connector_hooks_per_operation() -> Result<()> {
        let fixture = fixture().await?;

        let found = fixture
            .service
            .execute(admin(), |api| async move {
                api.create_one("Tag", CreateOneArgs::new(json!({ "name": "rust" })))
                    .await?;
                let found = api.find_many("Tag", FindManyArgs::default()).await?;
                api.delete_one("Tag", DeleteOneArgs::new(json!({ "name": "rust" })))
                    .await?;
                Ok::<_, NodeServiceError>(found)
            })
            .await?;
        assert_eq!(found.len(), 1);

        assert_eq!(
            fixture.store.call_labels(),
            vec![
                "pre_operation",
                "create Tag",
                "find Tag",
                "delete Tag",
                "post_successful_operation",
                "post_operation",
            ]
        );
        let calls = fixture.store.calls();
        assert!(calls.iter().all(|call| call.operation_id == calls[0].operation_id));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_operations_run_the_failure_hook() -> Result<()> {
        let fixture = fixture().await?;
        let mut changes = fixture.service.subscribe();
        fixture.store.fail_on("create");

        let err = fixture
            .service
            .create_one(&admin(), "Tag", CreateOneArgs::new(json!({ "name": "rust" })))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeServiceError::Connector { operation: "create", .. }));
        assert_eq!(
            fixture.store.call_labels(),
            vec!["pre_operation", "create Tag", "post_failed_operation", "post_operation"]
        );
        assert!(changes.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_pre_operation_failure_skips_the_operation() -> Result<()> {
        let fixture = fixture().await?;
        fixture.store.fail_on("pre_operation");

        let err = fixture
            .service
            .find_many(&admin(), "Tag", FindManyArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeServiceError::Connector { operation: "pre_operation", .. }));
        assert_eq!(fixture.store.call_count("find"), 0);
        assert_eq!(fixture.store.call_count("post_failed_operation"), 1);
        assert_eq!(fixture.store.call_count("post_operation"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_join_the_operation() -> Result<()> {
        let mut hooks = hooks();
        let article = hooks
            .remove("Article")
            .unwrap_or_default()
            .lifecycle(ArticleDefaults);
        hooks.insert("Article".to_string(), article);
        let fixture = build(hooks).await?;
        let mut changes = fixture.service.subscribe();

        let article = fixture.create("Article", json!({ "title": "Counted" })).await?;
        // Reselected after the hook
        assert_eq!(article["views"], json!(0));

        assert_eq!(
            fixture.store.call_labels(),
            vec![
                "pre_operation",
                "create Article",
                "find Article",
                "update Article",
                "find Article",
                "find Article",
                "create ArticleExtension",
                "find Article",
                "post_successful_operation",
                "post_operation",
            ]
        );

        let first = timeout(Duration::from_secs(1), changes.recv()).await??;
        let second = timeout(Duration::from_secs(1), changes.recv()).await??;
        let third = timeout(Duration::from_secs(1), changes.recv()).await??;
        assert_eq!(
            (first.event_type(), first.node_type()),
            ("node:created", "Article")
        );
        assert!(matches!(
            &second,
            NodeChange::Updated { updated_fields, .. } if updated_fields == &vec!["views".to_string()]
        ));
        assert_eq!(
            (third.event_type(), third.node_type()),
            ("node:created", "ArticleExtension")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_lifecycle_errors_fail_the_operation() -> Result<()> {
        let mut hooks = hooks();
        let tag = hooks
            .remove("Tag")
            .unwrap_or_default()
            .lifecycle(ProtectedTags);
        hooks.insert("Tag".to_string(), tag);
        let fixture = build(hooks).await?;
        fixture.create("Tag", json!({ "name": "drop" })).await?;
        fixture.create("Tag", json!({ "name": "keep" })).await?;

        let deleted = Arc::new(Mutex::new(0));
        let counter = deleted.clone();
        fixture.service.on_change(Some("Tag"), move |change| {
            if change.event_type() == "node:deleted" {
                *counter.lock().unwrap() += 1;
            }
        });

        let err = fixture
            .service
            .delete_many(&admin(), "Tag", DeleteManyArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeServiceError::Hook { .. }));
        assert_eq!(fixture.store.call_count("post_failed_operation"), 1);
        assert_eq!(*deleted.lock().unwrap(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_changes_are_dispatched_in_order() -> Result<()> {
        let fixture = fixture().await?;
        let mut changes = fixture.service.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        fixture.service.on_change(Some("Category"), move |change| {
            sink.lock()
                .unwrap()
                .push(change.node().get("slug").cloned().unwrap_or_default());
        });

        fixture
            .create(
                "Category",
                json!({
                    "title": "Parent",
                    "order": 1,
                    "children": { "create": [{ "title": "A", "order": 3 }] }
                }),
            )
            .await?;
        fixture.create("Tag", json!({ "name": "rust" })).await?;

        // The parent is queued before its nested children
        assert_eq!(*seen.lock().unwrap(), vec![json!("parent"), json!("a")]);

        let mut order = Vec::new();
        for _ in 0..3 {
            let change = timeout(Duration::from_secs(1), changes.recv()).await??;
            order.push(change.node_type().to_string());
        }
        assert_eq!(order, vec!["Category", "Category", "Tag"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_events_name_the_updated_fields() -> Result<()> {
        let fixture = fixture().await?;
        fixture.create("Category", json!({ "title": "News", "order": 1 })).await?;
        let mut changes = fixture.service.subscribe();
        let request = admin();

        fixture
            .service
            .update_one(
                &request,
                "Category",
                UpdateOneArgs::new(
                    json!({ "id": 2 }),
                    json!({ "title": "Latest", "children": { "create": [{ "title": "Sport", "order": 1 }] } }),
                ),
            )
            .await?;
        // An empty patch changes nothing
        fixture
            .service
            .update_one(&request, "Category", UpdateOneArgs::new(json!({ "id": 2 }), json!({})))
            .await?;

        let updated = timeout(Duration::from_secs(1), changes.recv()).await??;
        match updated {
            NodeChange::Updated { node, updated_fields, .. } => {
                assert_eq!(node["title"], json!("Latest"));
                assert_eq!(updated_fields, vec!["title", "children"]);
            }
            other => panic!("unexpected change {:?}", other),
        }
        let created = timeout(Duration::from_secs(1), changes.recv()).await??;
        assert_eq!(created.event_type(), "node:created");
        assert!(changes.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() -> Result<()> {
        let fixture = fixture().await?;
        let args = || {
            UpsertArgs::new(
                json!({ "name": "rust" }),
                json!({ "name": "rust" }),
                json!({ "name": "rust-lang" }),
            )
        };

        let created = fixture.service.upsert(&admin(), "Tag", args()).await?;
        assert_eq!(created["name"], json!("rust"));
        assert_eq!(fixture.store.call_count("create"), 1);

        let updated = fixture.service.upsert(&admin(), "Tag", args()).await?;
        assert_eq!(updated["name"], json!("rust-lang"));
        assert_eq!(updated["_id"], created["_id"]);
        assert_eq!(fixture.store.call_count("create"), 1);
        assert_eq!(fixture.store.call_count("update"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_handles_are_revoked_once_the_operation_ends() -> Result<()> {
        let mut hooks = hooks();
        let leaked: Arc<Mutex<Option<BoundApi>>> = Arc::new(Mutex::new(None));
        let slot = leaked.clone();
        hooks.insert(
            "Tag".to_string(),
            NodeTypeHooks::new().post_creation_parse_with(move |args| {
                *slot.lock().unwrap() = Some(args.api.clone());
                Ok(args.payload)
            }),
        );
        let fixture = build(hooks).await?;

        fixture
            .create("Tag", json!({ "_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8", "name": "rust" }))
            .await?;
        let api = leaked.lock().unwrap().take().expect("hook ran");
        assert!(api.is_revoked());

        let err = api
            .find_many("Tag", FindManyArgs::default())
            .await
            .unwrap_err();
        assert!(err.is_revoked());
        Ok(())
    }
}
