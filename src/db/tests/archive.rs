use crate::db::*;
use crate::types::Platform;
use tempfile::NamedTempFile;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_add_and_list_in_insertion_order() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let inserted = db
        .add_to_archive(Platform::Instagram, &names(&["zed", "amy", "bob"]))
        .await
        .unwrap();
    assert_eq!(inserted, 3);

    let listing = db.list_archive().await.unwrap();
    assert_eq!(listing.instagram, vec!["zed", "amy", "bob"]);
    assert!(listing.twitter.is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_add_is_idempotent_per_platform() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.add_to_archive(Platform::Twitter, &names(&["amy"]))
        .await
        .unwrap();
    let inserted = db
        .add_to_archive(Platform::Twitter, &names(&["amy", "bob", "amy"]))
        .await
        .unwrap();
    assert_eq!(inserted, 1, "only bob is new");

    // Same name on another platform is a separate entry
    let inserted = db
        .add_to_archive(Platform::Instagram, &names(&["amy"]))
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let listing = db.list_archive().await.unwrap();
    assert_eq!(listing.twitter, vec!["amy", "bob"]);
    assert_eq!(listing.instagram, vec!["amy"]);

    db.close().await;
}

#[tokio::test]
async fn test_add_skips_blank_names() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let inserted = db
        .add_to_archive(Platform::Instagram, &names(&["", "  ", "amy"]))
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    db.close().await;
}

#[tokio::test]
async fn test_clear_only_affects_one_platform() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.add_to_archive(Platform::Instagram, &names(&["a", "b"]))
        .await
        .unwrap();
    db.add_to_archive(Platform::Twitter, &names(&["c"]))
        .await
        .unwrap();

    assert_eq!(db.clear_archive(Platform::Instagram).await.unwrap(), 2);
    let listing = db.list_archive().await.unwrap();
    assert!(listing.instagram.is_empty());
    assert_eq!(listing.twitter, vec!["c"]);

    // Clearing an empty platform is not an error
    assert_eq!(db.clear_archive(Platform::Instagram).await.unwrap(), 0);

    db.close().await;
}

#[tokio::test]
async fn test_entries_carry_timestamps() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let before = chrono::Utc::now().timestamp();
    db.add_to_archive(Platform::Twitter, &names(&["amy"]))
        .await
        .unwrap();

    let entries = db.list_archive_entries(Platform::Twitter).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].platform, "twitter");
    assert!(entries[0].added_at >= before);

    db.close().await;
}
