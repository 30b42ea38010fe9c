//! Integration tests for the user, note and note set repositories.
//!
//! This test suite validates:
//! - Note listing by owner with and without extra filters
//! - Post/get round trip, including notes filed in no set
//! - Partial edits leave other fields unchanged
//! - Note set delete removes its notes in the same transaction
//! - Concurrent first logins for one gid create a single user
//! - Concurrent inserts into one table all get distinct dense ids
//!
//! **IMPORTANT**: These tests require PostgreSQL. Each test runs in its own
//! schema, created and dropped by `TestDatabase`.
//! Run with `cargo test -p dumpnote-db -- --ignored`.

use chrono::{Duration, SubsecRound, Utc};
use dumpnote_db::test_fixtures::TestDatabase;
use dumpnote_db::{
    ListNotesRequest, NewUser, NoteChanges, NoteRepository, NoteSetRepository, NoteSetType,
    Operator, Predicate, SortOrder, UserRepository,
};

/// Load `.env` so `DATABASE_URL` can live there, then open an isolated schema.
async fn setup() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

fn new_user(gid: &str) -> NewUser {
    NewUser {
        gid: gid.to_string(),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
    }
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_owner_listing_with_set_filter() {
    let test_db = setup().await;
    let db = &test_db.db;

    let user = db.users.create_or_get(new_user("g1")).await.unwrap();
    assert_eq!(user.id, 0);

    let daily = db
        .sets
        .create(user.id, "Daily", NoteSetType::Daily)
        .await
        .unwrap();
    assert_eq!(daily.id, 0);

    let filed = db.notes.post(user.id, "standup", Some(&daily)).await.unwrap();
    let loose = db.notes.post(user.id, "buy milk", None).await.unwrap();

    let in_set = db
        .notes
        .list_for_owner(
            user.id,
            ListNotesRequest {
                filters: vec![Predicate::eq("set", 0)],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(in_set, vec![filed.clone()]);

    let all = db
        .notes
        .list_for_owner(user.id, ListNotesRequest::default())
        .await
        .unwrap();
    assert_eq!(all, vec![filed.clone(), loose.clone()]);

    let newest_first = db
        .notes
        .list_for_owner(
            user.id,
            ListNotesRequest {
                order: SortOrder::Desc,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(newest_first, vec![loose, filed]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_post_then_get_round_trips() {
    let test_db = setup().await;
    let db = &test_db.db;
    let user = db.users.create_or_get(new_user("g1")).await.unwrap();

    let posted = db.notes.post(user.id, "hello", None).await.unwrap();
    let fetched = db.notes.get(posted.id).await.unwrap().unwrap();

    assert_eq!(fetched, posted);
    assert_eq!(fetched.set, None);
    assert!(db.notes.get(posted.id + 1).await.unwrap().is_none());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_partial_edit_changes_only_given_fields() {
    let test_db = setup().await;
    let db = &test_db.db;
    let user = db.users.create_or_get(new_user("g1")).await.unwrap();
    let note = db.notes.post(user.id, "draft", None).await.unwrap();

    db.notes
        .edit(
            note.id,
            NoteChanges {
                marked: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let fetched = db.notes.get(note.id).await.unwrap().unwrap();
    assert!(fetched.marked);
    assert_eq!(fetched.body, "draft");
    assert_eq!(fetched.timestamp, note.timestamp);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_timestamp_and_search_filters() {
    let test_db = setup().await;
    let db = &test_db.db;
    let user = db.users.create_or_get(new_user("g1")).await.unwrap();

    let old = db.notes.post(user.id, "old milk", None).await.unwrap();
    let cutoff = (Utc::now() + Duration::seconds(1)).trunc_subsecs(6);
    db.notes
        .edit(
            old.id,
            NoteChanges {
                timestamp: Some(cutoff - Duration::days(2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    db.notes.post(user.id, "fresh bread", None).await.unwrap();

    let recent = db
        .notes
        .list_for_owner(
            user.id,
            ListNotesRequest {
                filters: vec![
                    Predicate::new("timestamp", Operator::Gt, cutoff - Duration::days(1)),
                    Predicate::new("body", Operator::Like, "%bread%"),
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].body, "fresh bread");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_set_delete_removes_its_notes() {
    let test_db = setup().await;
    let db = &test_db.db;
    let user = db.users.create_or_get(new_user("g1")).await.unwrap();

    let set = db
        .sets
        .create(user.id, "Trip", NoteSetType::Untimed)
        .await
        .unwrap();
    let first = db.notes.post(user.id, "passport", Some(&set)).await.unwrap();
    let second = db.notes.post(user.id, "tickets", Some(&set)).await.unwrap();
    let outside = db.notes.post(user.id, "unrelated", None).await.unwrap();

    assert_eq!(db.sets.notes(set.id, None).await.unwrap().len(), 2);

    db.sets.delete(set.id).await.unwrap();

    assert!(db.sets.get(set.id).await.unwrap().is_none());
    assert!(db.notes.get(first.id).await.unwrap().is_none());
    assert!(db.notes.get(second.id).await.unwrap().is_none());
    assert!(db.notes.get(outside.id).await.unwrap().is_some());
    assert!(db.sets.notes(set.id, None).await.unwrap().is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_concurrent_first_login_creates_one_user() {
    let test_db = setup().await;
    let db = test_db.db.clone();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.users.create_or_get(new_user("g1")).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE gid = 'g1'")
        .fetch_one(&test_db.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_concurrent_posts_get_distinct_ids() {
    let test_db = setup().await;
    let db = test_db.db.clone();
    let owner = db.users.create_or_get(new_user("g1")).await.unwrap().id;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move { db.notes.post(owner, &format!("note {}", i), None).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..16).collect::<Vec<i64>>());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_concurrent_logins_with_distinct_gids_all_succeed() {
    let test_db = setup().await;
    let db = test_db.db.clone();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move { db.users.create_or_get(new_user(&format!("g{}", i))).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..16).collect::<Vec<i64>>());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT gid) FROM users")
        .fetch_one(&test_db.pool)
        .await
        .unwrap();
    assert_eq!(count, 16);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_concurrent_set_creation_gets_distinct_ids() {
    let test_db = setup().await;
    let db = test_db.db.clone();
    let owner = db.users.create_or_get(new_user("g1")).await.unwrap().id;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                db.sets
                    .create(owner, &format!("set {}", i), NoteSetType::Daily)
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..16).collect::<Vec<i64>>());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_user_edit_is_visible_through_resolve() {
    let test_db = setup().await;
    let db = &test_db.db;
    let user = db.users.create_or_get(new_user("g1")).await.unwrap();

    db.users
        .edit(
            user.id,
            dumpnote_db::UserChanges {
                name: Some("Countess of Lovelace".to_string()),
                email: None,
            },
        )
        .await
        .unwrap();

    let resolved = db.users.resolve(user.id).await.unwrap().unwrap();
    assert_eq!(resolved.name, "Countess of Lovelace");
    assert_eq!(resolved.email, "ada@example.com");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_grouped_or_keeps_owner_scope() {
    let test_db = setup().await;
    let db = &test_db.db;
    let ada = db.users.create_or_get(new_user("g1")).await.unwrap();
    let bob = db.users.create_or_get(new_user("g2")).await.unwrap();

    let marked = db.notes.post(ada.id, "first", None).await.unwrap();
    db.notes
        .edit(
            marked.id,
            NoteChanges {
                marked: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    db.notes.post(ada.id, "second", None).await.unwrap();
    db.notes.post(bob.id, "third", None).await.unwrap();

    // owner = ada AND (marked OR body = 'third'): bob's note must not leak in.
    let filter = Predicate::eq("marked", true).or(Predicate::eq("body", "third"));
    let listed = db
        .notes
        .list_for_owner(
            ada.id,
            ListNotesRequest {
                filters: vec![filter],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, marked.id);

    test_db.cleanup().await;
}
