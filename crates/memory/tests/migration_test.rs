//! Startup migration of the pre-scoping layout (`<root>/<channelId>.json`)
//! into the guild/dm directory layout.

use chrono::Utc;
use memory::{ConversationRecord, MemoryConfig, MemoryMessage, MemoryStore};
use tempfile::TempDir;

fn legacy_record(channel_id: &str, guild_id: Option<&str>) -> String {
    let record = ConversationRecord {
        channel_id: channel_id.to_string(),
        guild_id: guild_id.map(str::to_string),
        messages: vec![MemoryMessage {
            id: "1".to_string(),
            channel_id: channel_id.to_string(),
            guild_id: guild_id.map(str::to_string),
            author: "alice".to_string(),
            author_id: "100".to_string(),
            content: "from the old layout".to_string(),
            timestamp: Utc::now(),
            is_bot: false,
        }],
        last_updated: Utc::now(),
    };
    serde_json::to_string_pretty(&record).unwrap()
}

async fn load(dir: &TempDir) -> MemoryStore {
    MemoryStore::load(dir.path(), MemoryConfig::default())
        .await
        .expect("store loads")
}

#[tokio::test]
async fn legacy_file_with_guild_id_moves_into_the_guild_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("c1.json"), legacy_record("c1", Some("g1"))).unwrap();

    let store = load(&dir).await;

    assert!(!dir.path().join("c1.json").exists());
    assert!(dir.path().join("g1").join("c1.json").exists());

    let window = store.select_context("c1", Some("g1"), None).await;
    assert_eq!(window.messages.len(), 1);
    assert_eq!(window.messages[0].content, "from the old layout");
}

#[tokio::test]
async fn legacy_file_without_guild_id_moves_into_dm() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("c7.json"), legacy_record("c7", None)).unwrap();

    let store = load(&dir).await;

    assert!(!dir.path().join("c7.json").exists());
    assert!(dir.path().join("dm").join("c7.json").exists());

    let window = store.select_context("c7", None, None).await;
    assert_eq!(window.messages.len(), 1);
}

#[tokio::test]
async fn legacy_file_omitting_the_guild_field_entirely_routes_to_dm() {
    // The very oldest files have no guildId key at all.
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("c8.json"),
        r#"{"channelId":"c8","messages":[],"lastUpdated":"2024-01-01T00:00:00.000Z"}"#,
    )
    .unwrap();

    load(&dir).await;
    assert!(dir.path().join("dm").join("c8.json").exists());
}

#[tokio::test]
async fn migration_is_idempotent_across_restarts() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("c1.json"), legacy_record("c1", Some("g1"))).unwrap();

    load(&dir).await;
    let first = std::fs::read_to_string(dir.path().join("g1").join("c1.json")).unwrap();

    // Second startup finds nothing left at the root and changes nothing.
    let store = load(&dir).await;
    let second = std::fs::read_to_string(dir.path().join("g1").join("c1.json")).unwrap();
    assert_eq!(first, second);
    assert_eq!(store.stats().await.total_messages, 1);
}

#[tokio::test]
async fn corrupt_legacy_file_is_left_untouched_and_startup_continues() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.json"), "{this is not json").unwrap();
    std::fs::write(dir.path().join("ok.json"), legacy_record("ok", Some("g1"))).unwrap();

    let store = load(&dir).await;

    assert_eq!(
        std::fs::read_to_string(dir.path().join("bad.json")).unwrap(),
        "{this is not json"
    );
    assert!(dir.path().join("g1").join("ok.json").exists());
    assert_eq!(store.stats().await.total_messages, 1);
}

#[tokio::test]
async fn occupied_target_leaves_the_legacy_file_in_place() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("g1")).unwrap();
    std::fs::write(
        dir.path().join("g1").join("c1.json"),
        legacy_record("c1", Some("g1")),
    )
    .unwrap();
    std::fs::write(dir.path().join("c1.json"), legacy_record("c1", Some("g1"))).unwrap();

    load(&dir).await;

    // Scoped data wins; the stale root file stays for manual inspection.
    assert!(dir.path().join("c1.json").exists());
    assert!(dir.path().join("g1").join("c1.json").exists());
}

#[tokio::test]
async fn corrupt_scoped_file_is_skipped_and_its_scope_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("g1")).unwrap();
    std::fs::write(dir.path().join("g1").join("c1.json"), "garbage").unwrap();

    let store = load(&dir).await;
    assert_eq!(store.stats().await.scope_count, 0);

    let window = store.select_context("c1", Some("g1"), None).await;
    assert!(window.messages.is_empty());

    // The bad file is preserved on disk until the scope is written again.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("g1").join("c1.json")).unwrap(),
        "garbage"
    );
}
