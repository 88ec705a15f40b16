//! Deferred adapter: buffering, flushing and lifecycle triggers.

mod common;

use common::{jar_header, raw_config, seeded_jar, written_batches, WarningCapture};
use jarstore_chunk::MAX_CHUNK_SIZE;
use jarstore_storage::{
    BackingCapability, DeferredStorage, JarOp, LifecycleEvent, MemoryJar, SessionStorage,
    SessionStore, StorageConfig, StorageError, StorageMode,
};
use std::sync::Arc;

fn deferred(jar: &Arc<MemoryJar>) -> DeferredStorage {
    DeferredStorage::new(
        raw_config(StorageMode::Deferred),
        BackingCapability::bulk(jar.clone()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_pending_values_shadow_backing_store() {
    let jar = seeded_jar(&[("a", "stored-a"), ("b", "stored-b")]).await;
    let storage = deferred(&jar);
    assert!(storage.is_server());

    storage.set_item("a", "pending-a").await.unwrap();
    storage.remove_item("b").await.unwrap();

    assert_eq!(
        storage.get_item("a").await.unwrap().as_deref(),
        Some("pending-a")
    );
    assert_eq!(storage.get_item("b").await.unwrap(), None);
    assert_eq!(jar.read_count().await, 0);
    assert_eq!(jar.write_count().await, 0);

    assert_eq!(jar_header(&jar).await, "a=stored-a;b=stored-b");
}

#[tokio::test]
async fn test_untouched_keys_read_through() {
    let jar = seeded_jar(&[("c.0", "chu"), ("c.1", "nked")]).await;
    let storage = deferred(&jar);
    assert_eq!(
        storage.get_item("c").await.unwrap().as_deref(),
        Some("chunked")
    );
    assert_eq!(jar.read_count().await, 1);
}

#[tokio::test]
async fn test_set_then_remove_and_remove_then_set() {
    let jar = Arc::new(MemoryJar::new());
    let storage = deferred(&jar);

    storage.set_item("k", "v").await.unwrap();
    storage.remove_item("k").await.unwrap();
    assert_eq!(storage.get_item("k").await.unwrap(), None);

    storage.set_item("k", "again").await.unwrap();
    assert_eq!(
        storage.get_item("k").await.unwrap().as_deref(),
        Some("again")
    );
    let pending = storage.pending().await;
    assert_eq!(pending.removals().count(), 0);
    assert_eq!(pending.writes().count(), 1);
}

#[tokio::test]
async fn test_apply_flushes_one_batch() {
    let jar = seeded_jar(&[
        ("session.0", "old"),
        ("session.1", "old"),
        ("session.2", "old"),
        ("gone", "x"),
        ("unrelated", "keep"),
    ])
    .await;
    let storage = deferred(&jar);

    storage
        .set_item("session", &"s".repeat(MAX_CHUNK_SIZE + 10))
        .await
        .unwrap();
    storage.remove_item("gone").await.unwrap();
    assert!(storage.apply().await.unwrap());

    assert_eq!(
        jar.ops().await[0],
        JarOp::ReadAll {
            hints: vec!["session".to_string(), "gone".to_string()]
        }
    );
    assert_eq!(
        written_batches(&jar).await,
        vec![vec![
            "gone".to_string(),
            "session.2".to_string(),
            "session.0".to_string(),
            "session.1".to_string(),
        ]]
    );
    assert_eq!(
        jar_header(&jar).await,
        format!(
            "session.0={};session.1={};unrelated=keep",
            "s".repeat(MAX_CHUNK_SIZE),
            "s".repeat(10)
        )
    );
}

#[tokio::test]
async fn test_apply_does_not_clear_pending() {
    let jar = Arc::new(MemoryJar::new());
    let storage = deferred(&jar);
    storage.set_item("k", "v").await.unwrap();

    assert!(storage.apply().await.unwrap());
    assert!(storage.has_pending_changes().await);
    assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("v"));

    // A second flush re-emits the same pending writes.
    assert!(storage.apply().await.unwrap());
    assert_eq!(jar.write_count().await, 2);
    assert_eq!(
        written_batches(&jar).await,
        vec![vec!["k".to_string()], vec!["k".to_string()]]
    );
}

#[tokio::test]
async fn test_cleared_pending_skips_backing_store() {
    let jar = Arc::new(MemoryJar::new());
    let storage = deferred(&jar);
    storage.set_item("k", "v").await.unwrap();

    let taken = storage.take_pending().await;
    assert_eq!(taken.writes().count(), 1);
    assert!(!storage.has_pending_changes().await);

    assert!(!storage.apply().await.unwrap());
    assert!(jar.ops().await.is_empty());

    storage.set_item("k", "w").await.unwrap();
    storage.clear_pending().await;
    assert!(!storage.apply().await.unwrap());
    assert!(jar.ops().await.is_empty());
}

#[tokio::test]
async fn test_removing_absent_key_writes_nothing() {
    let jar = seeded_jar(&[("other", "1")]).await;
    let storage = deferred(&jar);
    storage.remove_item("missing").await.unwrap();
    assert!(!storage.apply().await.unwrap());
    assert_eq!(jar.read_count().await, 1);
    assert_eq!(jar.write_count().await, 0);
}

#[tokio::test]
async fn test_code_verifier_written_through() {
    let jar = Arc::new(MemoryJar::new());
    let storage = deferred(&jar);

    storage.set_item("sb-auth-token", "session").await.unwrap();
    storage
        .set_item("sb-auth-token-code-verifier", "verifier")
        .await
        .unwrap();

    assert_eq!(
        written_batches(&jar).await,
        vec![vec!["sb-auth-token-code-verifier".to_string()]]
    );
    assert_eq!(
        jar_header(&jar).await,
        "sb-auth-token-code-verifier=verifier"
    );
    // Still pending, so the next flush carries it as well.
    assert_eq!(storage.pending().await.writes().count(), 2);
}

#[tokio::test]
async fn test_code_verifier_removal_is_deferred() {
    let jar = seeded_jar(&[("sb-auth-token-code-verifier", "verifier")]).await;
    let storage = deferred(&jar);
    storage
        .remove_item("sb-auth-token-code-verifier")
        .await
        .unwrap();
    assert!(jar.ops().await.is_empty());
    assert_eq!(
        storage
            .get_item("sb-auth-token-code-verifier")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_custom_transient_suffixes() {
    let jar = Arc::new(MemoryJar::new());
    let config = StorageConfig {
        transient_key_suffixes: vec!["-nonce".to_string()],
        ..raw_config(StorageMode::Deferred)
    };
    let storage = DeferredStorage::new(config, BackingCapability::bulk(jar.clone())).unwrap();
    storage.set_item("k-code-verifier", "a").await.unwrap();
    assert_eq!(jar.write_count().await, 0);
    storage.set_item("k-nonce", "b").await.unwrap();
    assert_eq!(jar.write_count().await, 1);
}

#[tokio::test]
async fn test_lifecycle_events() {
    let jar = Arc::new(MemoryJar::new());
    let storage = deferred(&jar);

    assert!(!storage
        .on_lifecycle_event(LifecycleEvent::SignedIn)
        .await
        .unwrap());
    assert!(jar.ops().await.is_empty());

    storage.set_item("k", "v").await.unwrap();
    assert!(!storage
        .on_lifecycle_event(LifecycleEvent::InitialSession)
        .await
        .unwrap());
    assert!(jar.ops().await.is_empty());

    assert!(storage
        .on_lifecycle_event(LifecycleEvent::TokenRefreshed)
        .await
        .unwrap());
    assert_eq!(jar.value("k").await.as_deref(), Some("v"));
}

#[tokio::test]
async fn test_read_only_store_warns_instead_of_writing() {
    let jar = seeded_jar(&[("k", "stored")]).await;
    let storage = DeferredStorage::new(
        raw_config(StorageMode::Deferred),
        BackingCapability::ReadOnlyBulk {
            source: jar.clone(),
        },
    )
    .unwrap();
    let (capture, _guard) = WarningCapture::install();

    storage.set_item("k", "new").await.unwrap();
    // The batch reaches the sink, which drops it.
    assert!(storage.apply().await.unwrap());

    assert_eq!(jar.write_count().await, 0);
    assert_eq!(jar_header(&jar).await, "k=stored");
    assert!(capture
        .messages()
        .iter()
        .any(|m| m.contains("without a write capability")));
}

#[tokio::test]
async fn test_missing_backing_store_rejected() {
    let result = DeferredStorage::new(raw_config(StorageMode::Deferred), BackingCapability::None);
    assert!(matches!(
        result,
        Err(StorageError::InsufficientCapability(_))
    ));
}

#[tokio::test]
async fn test_apply_through_session_store() {
    let jar = Arc::new(MemoryJar::new());
    let store = SessionStore::build(
        StorageConfig::for_mode(StorageMode::Deferred),
        BackingCapability::bulk(jar.clone()),
    )
    .unwrap();
    store.set_item("k", "value").await.unwrap();

    let deferred = store.as_deferred().unwrap();
    assert!(deferred.apply().await.unwrap());
    assert!(jar.value("k").await.unwrap().starts_with("base64-"));

    deferred.clear_pending().await;
    assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("value"));
}
