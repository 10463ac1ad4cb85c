mod common;

use common::{comment, harness};
use optimistic_cache::application::coordinator::AddComment;
use optimistic_cache::domain::cache::{CacheEntry, CacheKey};
use optimistic_cache::domain::comment::CommentNode;
use optimistic_cache::domain::ports::CacheStore;
use optimistic_cache::domain::reaction::ReactionAggregate;

/// A chain `d0 -> d1 -> ... -> d{depth}` next to an unrelated root.
fn chain(depth: usize) -> Vec<CommentNode> {
    let mut node = comment(&format!("d{depth}"), vec![]);
    for level in (0..depth).rev() {
        node = comment(&format!("d{level}"), vec![node]);
    }
    vec![node, comment("unrelated", vec![comment("unrelated-child", vec![])])]
}

#[tokio::test]
async fn test_comment_rollback_restores_any_depth() {
    for depth in 0..=4 {
        let h = harness();
        let key = CacheKey::Comments("post-1".to_string());
        let original = chain(depth);
        h.store
            .set(&key, CacheEntry::Comments(original.clone()))
            .await
            .unwrap();

        for target in [None, Some(format!("d{depth}"))] {
            h.transport.push_error(Some(500), "boom").await;
            let result = h
                .coordinator
                .add_comment(AddComment {
                    container_id: "post-1".to_string(),
                    body: "reply".to_string(),
                    parent_id: target.clone(),
                })
                .await;

            assert!(result.is_err());
            assert_eq!(
                h.store.get(&key).await.unwrap(),
                Some(CacheEntry::Comments(original.clone())),
                "depth {depth}, target {target:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_reaction_rollback_restores_every_branch() {
    let cases = [
        (ReactionAggregate::new([("like", 5)], None), "like"),
        (ReactionAggregate::new([("like", 6)], Some("like")), "like"),
        (
            ReactionAggregate::new([("like", 5), ("love", 3)], Some("love")),
            "like",
        ),
        (ReactionAggregate::new([("like", 0)], Some("like")), "like"),
    ];

    for (original, kind) in cases {
        let h = harness();
        let key = CacheKey::Reactions("c1".to_string());
        h.store
            .set(&key, CacheEntry::Reactions(original.clone()))
            .await
            .unwrap();
        h.transport.push_error(None, "offline").await;

        assert!(h.coordinator.toggle_reaction("c1", kind).await.is_err());
        assert_eq!(
            h.store.get(&key).await.unwrap(),
            Some(CacheEntry::Reactions(original))
        );
    }
}
