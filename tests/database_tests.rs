// Database integration tests
// Tests SQLite operations in isolation using in-memory database

mod common;

use subdrill::model::ItemKind;
use subdrill::repository::{CacheStats, Database, ParticipantLookup, SCHEMA_VERSION};
use tempfile::TempDir;

use common::{activity, create_test_db, drilldown};

#[tokio::test]
async fn test_schema_init() {
    let db = Database::new(":memory:").await.unwrap();

    let rebuilt = db.init_schema().await.unwrap();
    assert!(rebuilt, "First init_schema should return true");

    let rebuilt = db.init_schema().await.unwrap();
    assert!(!rebuilt, "Second init_schema should return false");

    let version: String = sqlx::query_scalar("SELECT value FROM metadata WHERE key = 'schema_version'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_schema_version_change_drops_cache() {
    let db = create_test_db().await;
    db.save_participant("ann", &[activity("beta", 4)]).await.unwrap();

    sqlx::query("UPDATE metadata SET value = '0' WHERE key = 'schema_version'")
        .execute(db.pool())
        .await
        .unwrap();
    assert!(db.init_schema().await.unwrap());
    assert!(!db.is_participant_cached("ann").await);
}

#[tokio::test]
async fn test_stats_count_entries() {
    let db = create_test_db().await;
    assert_eq!(db.stats().await.unwrap(), CacheStats { participants: 0, drilldowns: 0 });

    db.save_participant("ann", &[activity("beta", 4)]).await.unwrap();
    db.save_participant("bob", &[]).await.unwrap();
    db.save_drilldown(&drilldown("alpha", 12, &[("beta", 6)])).await.unwrap();

    assert_eq!(db.stats().await.unwrap(), CacheStats { participants: 2, drilldowns: 1 });
}

#[tokio::test]
async fn test_participant_roundtrip() {
    let db = create_test_db().await;
    let mut records = vec![activity("beta", 4), activity("gamma", -2), activity("beta", 9)];
    records[1].kind = ItemKind::Thread;

    assert!(matches!(db.load_participant("ann").await.unwrap(), ParticipantLookup::Missing));
    assert!(db.save_participant("ann", &records).await.unwrap());

    match db.load_participant("ann").await.unwrap() {
        ParticipantLookup::Hit(loaded) => assert_eq!(loaded, records),
        other => panic!("expected hit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_participant_written_once() {
    let db = create_test_db().await;
    assert!(db.save_participant("ann", &[activity("beta", 4)]).await.unwrap());
    assert!(!db.save_participant("ann", &[activity("other", 7)]).await.unwrap());

    match db.load_participant("ann").await.unwrap() {
        ParticipantLookup::Hit(loaded) => assert_eq!(loaded, vec![activity("beta", 4)]),
        other => panic!("expected hit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_activity_is_still_cached() {
    let db = create_test_db().await;
    db.save_participant("quiet", &[]).await.unwrap();

    assert!(db.is_participant_cached("quiet").await);
    assert!(matches!(db.load_participant("quiet").await.unwrap(), ParticipantLookup::Hit(r) if r.is_empty()));
}

#[tokio::test]
async fn test_corrupt_participant_detected_and_deleted() {
    let db = create_test_db().await;
    db.save_participant("ann", &[activity("beta", 4)]).await.unwrap();

    sqlx::query("UPDATE participant_activity SET kind = 'bogus' WHERE participant = ?")
        .bind("ann")
        .execute(db.pool())
        .await
        .unwrap();
    assert!(matches!(db.load_participant("ann").await.unwrap(), ParticipantLookup::Corrupt(_)));

    db.delete_participant("ann").await.unwrap();
    assert!(matches!(db.load_participant("ann").await.unwrap(), ParticipantLookup::Missing));
}

#[tokio::test]
async fn test_wrong_column_type_is_corrupt() {
    let db = create_test_db().await;
    db.save_participant("ann", &[activity("beta", 4)]).await.unwrap();

    sqlx::query("UPDATE participant_activity SET score = 'lots' WHERE participant = ?")
        .bind("ann")
        .execute(db.pool())
        .await
        .unwrap();
    assert!(matches!(db.load_participant("ann").await.unwrap(), ParticipantLookup::Corrupt(_)));
}

#[tokio::test]
async fn test_drilldown_roundtrip_with_self_row() {
    let db = create_test_db().await;
    let record = drilldown("alpha", 120, &[("beta", 30), ("gamma", 12), ("delta", 12)]);

    assert!(db.load_drilldown("alpha").await.unwrap().is_none());
    assert!(db.save_drilldown(&record).await.unwrap());
    assert_eq!(db.load_drilldown("alpha").await.unwrap(), Some(record));

    let self_users: i64 = sqlx::query_scalar("SELECT users FROM drilldown_rows WHERE community = ? AND overlap = ?")
        .bind("alpha")
        .bind("alpha")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(self_users, 120);
}

#[tokio::test]
async fn test_drilldown_is_create_if_absent() {
    let db = create_test_db().await;
    let first = drilldown("alpha", 120, &[("beta", 30)]);
    let later = drilldown("alpha", 500, &[("beta", 90), ("gamma", 40)]);

    assert!(db.save_drilldown(&first).await.unwrap());
    assert!(!db.save_drilldown(&later).await.unwrap());
    assert_eq!(db.load_drilldown("alpha").await.unwrap(), Some(first));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drilldown_rows")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn test_drilldown_lookup_ignores_case() {
    let db = create_test_db().await;
    db.save_drilldown(&drilldown("Alpha", 40, &[("beta", 6)])).await.unwrap();

    let loaded = db.load_drilldown("alpha").await.unwrap().unwrap();
    assert_eq!(loaded.community, "Alpha");
    assert_eq!(loaded.total_participants, 40);
    assert!(!db.save_drilldown(&drilldown("ALPHA", 1, &[])).await.unwrap());
    assert_eq!(db.stats().await.unwrap().drilldowns, 1);
}

#[tokio::test]
async fn test_cache_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new(path).await.unwrap();
        db.init_schema().await.unwrap();
        db.save_participant("ann", &[activity("beta", 4)]).await.unwrap();
        db.save_drilldown(&drilldown("alpha", 12, &[])).await.unwrap();
    }

    let db = Database::new(path).await.unwrap();
    assert!(!db.init_schema().await.unwrap());
    assert!(db.is_participant_cached("ann").await);
    assert_eq!(db.load_drilldown("alpha").await.unwrap(), Some(drilldown("alpha", 12, &[])));
}
