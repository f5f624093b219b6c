//! Invariants of the list store under arbitrary operation sequences.

use std::collections::BTreeSet;

use feed_core::{FeedClient, HttpResponse, ListScope, ListSnapshot, ListStore, Post, PostPage, UserSummary};
use proptest::prelude::*;

fn post(id: &str) -> Post {
    Post {
        id: id.to_string(),
        author: UserSummary {
            id: "author".to_string(),
            display_name: "Author".to_string(),
            avatar: None,
        },
        content: Some(id.to_string()),
        media: None,
        likes: BTreeSet::new(),
        comments: Vec::new(),
        shares: 0,
        views: 0,
    }
}

fn store(ids: &[String]) -> ListStore {
    let snapshot = ListSnapshot {
        items: ids.iter().map(|id| post(id)).collect(),
        page: 1,
        total_pages: 0,
        ..ListSnapshot::default()
    };
    ListStore::with_snapshot(ListScope::Posts, FeedClient::new("http://api"), snapshot)
}

fn ack() -> Result<HttpResponse, feed_core::TransportError> {
    Ok(HttpResponse::new(200, "{}"))
}

fn unique_ids(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set("[a-z]{1,6}", 0..max).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #[test]
    fn even_like_toggles_restore_membership(
        ids in unique_ids(6).prop_filter("need a post", |v| !v.is_empty()),
        initially_liked in any::<bool>(),
        pairs in 0usize..5,
    ) {
        let mut store = store(&ids);
        let target = ids[0].clone();
        if initially_liked {
            let pending = store.toggle_like(&target, "me").unwrap();
            store.apply(pending.mutation, ack()).unwrap();
        }
        let before = store.snapshot().clone();
        for _ in 0..pairs * 2 {
            let pending = store.toggle_like(&target, "me").unwrap();
            store.apply(pending.mutation, ack()).unwrap();
        }
        prop_assert_eq!(store.snapshot(), &before);
    }

    #[test]
    fn later_pages_never_truncate(
        existing in unique_ids(8),
        fetched in unique_ids(8),
        page in 2u32..6,
    ) {
        let mut store = store(&existing);
        let pending = store.fetch_page(page, None, "u1").unwrap().unwrap();
        let body = serde_json::to_string(&PostPage {
            posts: fetched.iter().map(|id| post(id)).collect(),
            total_pages: 9,
            current_page: page,
        }).unwrap();
        store.apply(pending.mutation, Ok(HttpResponse::new(200, body))).unwrap();

        let got: Vec<&str> = store.snapshot().items.iter().map(|p| p.id.as_str()).collect();
        prop_assert!(got.len() >= existing.len());
        for (i, id) in existing.iter().enumerate() {
            prop_assert_eq!(got[i], id.as_str());
        }
        let unique: BTreeSet<&str> = got.iter().copied().collect();
        prop_assert_eq!(unique.len(), got.len());
    }

    #[test]
    fn first_page_always_replaces(
        existing in unique_ids(8),
        fetched in unique_ids(8),
    ) {
        let mut store = store(&existing);
        let pending = store.fetch_page(1, None, "u1").unwrap().unwrap();
        let body = serde_json::to_string(&PostPage {
            posts: fetched.iter().map(|id| post(id)).collect(),
            total_pages: 1,
            current_page: 1,
        }).unwrap();
        store.apply(pending.mutation, Ok(HttpResponse::new(200, body))).unwrap();

        let got: Vec<String> = store.snapshot().items.iter().map(|p| p.id.clone()).collect();
        prop_assert_eq!(got, fetched);
    }

    #[test]
    fn delete_removes_exactly_the_matches(
        ids in unique_ids(8),
        target in "[a-z]{1,6}",
    ) {
        let mut store = store(&ids);
        let matches = ids.iter().filter(|id| **id == target).count();
        let before = store.snapshot().items.len();
        let pending = store.delete_post(&target).unwrap();
        store.apply(pending.mutation, ack()).unwrap();
        prop_assert_eq!(store.snapshot().items.len(), before - matches);
        prop_assert!(store.snapshot().get(&target).is_none());
    }

    #[test]
    fn share_adds_exactly_one(
        ids in unique_ids(6).prop_filter("need a post", |v| !v.is_empty()),
        pick in any::<proptest::sample::Index>(),
    ) {
        let mut store = store(&ids);
        let target = pick.get(&ids).clone();
        let before: Vec<u64> = store.snapshot().items.iter().map(|p| p.shares).collect();
        let pending = store.increment_share(&target).unwrap();
        store.apply(pending.mutation, ack()).unwrap();
        for (i, p) in store.snapshot().items.iter().enumerate() {
            let expected = if p.id == target { before[i] + 1 } else { before[i] };
            prop_assert_eq!(p.shares, expected);
        }
    }
}

#[test]
fn share_scenario_two_posts() {
    let mut store = store(&["p1".to_string(), "p2".to_string()]);
    // p2 starts with three shares.
    for _ in 0..3 {
        let pending = store.increment_share("p2").unwrap();
        store.apply(pending.mutation, ack()).unwrap();
    }
    let pending = store.increment_share("p1").unwrap();
    store.apply(pending.mutation, ack()).unwrap();
    assert_eq!(store.snapshot().get("p1").unwrap().shares, 1);
    assert_eq!(store.snapshot().get("p2").unwrap().shares, 3);
}
