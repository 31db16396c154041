use anyhow::{Context, Result};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, QueryBuilder, Row, Sqlite, Transaction};
use std::str::FromStr;
use time::OffsetDateTime;

use crate::model::{ActivityRecord, DrilldownRecord, ItemKind, OverlapEntry};

use super::SCHEMA_VERSION;

const BATCH_SIZE: usize = 1000;

/// Result of looking up a participant's cached activity
#[derive(Debug)]
pub enum ParticipantLookup {
    /// Never fetched
    Missing,
    Hit(Vec<ActivityRecord>),
    /// Entry exists but its rows cannot be decoded
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub participants: u64,
    pub drilldowns: u64,
}

/// Database abstraction for SQLite operations
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Configure connection options with PRAGMAs applied to every connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-16000"); // 16MB cache

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Raw pool access, used by tests to inspect or damage rows
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> Result<bool> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        let stored_version = self.get_metadata("schema_version").await?;

        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                tracing::warn!(from = %old, to = SCHEMA_VERSION, "cache schema changed, rebuilding");
            }
            sqlx::query("DROP TABLE IF EXISTS participant_activity").execute(&self.pool).await?;
            sqlx::query("DROP TABLE IF EXISTS participants").execute(&self.pool).await?;
            sqlx::query("DROP TABLE IF EXISTS drilldown_rows").execute(&self.pool).await?;
            sqlx::query("DROP TABLE IF EXISTS drilldowns").execute(&self.pool).await?;
            sqlx::query("DELETE FROM metadata").execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS participants (
                name TEXT PRIMARY KEY,
                fetched_at INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS participant_activity (
                participant TEXT NOT NULL,
                community TEXT NOT NULL,
                kind TEXT NOT NULL,
                item_id TEXT NOT NULL,
                score INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_activity_participant ON participant_activity (participant)"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS drilldowns (
                community TEXT PRIMARY KEY COLLATE NOCASE,
                created_at INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        // The target's own row carries its total participant count
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS drilldown_rows (
                community TEXT NOT NULL COLLATE NOCASE,
                overlap TEXT NOT NULL,
                users INTEGER NOT NULL,
                position INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_drilldown_rows_community ON drilldown_rows (community)"
        ).execute(&self.pool).await?;

        if needs_rebuild {
            self.set_metadata("schema_version", SCHEMA_VERSION).await?;
        }

        Ok(needs_rebuild)
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Check whether a participant has a cache entry
    pub async fn is_participant_cached(&self, name: &str) -> bool {
        sqlx::query("SELECT 1 FROM participants WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
            .is_some()
    }

    /// Load a participant's cached activity rows
    pub async fn load_participant(&self, name: &str) -> Result<ParticipantLookup> {
        if !self.is_participant_cached(name).await {
            return Ok(ParticipantLookup::Missing);
        }

        let rows = sqlx::query(
            "SELECT community, kind, item_id, score FROM participant_activity WHERE participant = ? ORDER BY rowid"
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let decoded = (|| -> std::result::Result<ActivityRecord, String> {
                let community: String = row.try_get("community").map_err(|e| e.to_string())?;
                let kind: String = row.try_get("kind").map_err(|e| e.to_string())?;
                let item_id: String = row.try_get("item_id").map_err(|e| e.to_string())?;
                let score: i64 = row.try_get("score").map_err(|e| e.to_string())?;
                Ok(ActivityRecord::new(community, ItemKind::from_str(&kind)?, item_id, score))
            })();

            match decoded {
                Ok(record) => records.push(record),
                Err(reason) => return Ok(ParticipantLookup::Corrupt(reason)),
            }
        }

        Ok(ParticipantLookup::Hit(records))
    }

    /// Persist a participant's activity. Returns false if an entry already existed.
    pub async fn save_participant(&self, name: &str, records: &[ActivityRecord]) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT OR IGNORE INTO participants (name, fetched_at) VALUES (?, ?)")
            .bind(name)
            .bind(now_unix())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        self.save_activity_in_tx(&mut tx, name, records).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Remove a participant's entry and rows
    pub async fn delete_participant(&self, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM participant_activity WHERE participant = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM participants WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_activity_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
        records: &[ActivityRecord],
    ) -> Result<()> {
        for chunk in records.chunks(BATCH_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO participant_activity (participant, community, kind, item_id, score) "
            );
            qb.push_values(chunk, |mut row, record| {
                row.push_bind(name)
                    .push_bind(record.community.as_str())
                    .push_bind(record.kind.as_str())
                    .push_bind(record.item_id.as_str())
                    .push_bind(record.score);
            });
            qb.build().execute(&mut **tx).await?;
        }
        Ok(())
    }

    /// Load a drilldown record by community name (case-insensitive)
    pub async fn load_drilldown(&self, community: &str) -> Result<Option<DrilldownRecord>> {
        let header = sqlx::query("SELECT community FROM drilldowns WHERE community = ?")
            .bind(community)
            .fetch_optional(&self.pool)
            .await?;

        let Some(header) = header else {
            return Ok(None);
        };
        let stored_name: String = header.get("community");

        let rows = sqlx::query(
            "SELECT overlap, users FROM drilldown_rows WHERE community = ? ORDER BY position"
        )
        .bind(community)
        .fetch_all(&self.pool)
        .await?;

        let mut total = None;
        let mut overlaps = Vec::with_capacity(rows.len());
        for row in rows {
            let overlap: String = row.get("overlap");
            let users: i64 = row.get("users");
            if overlap.eq_ignore_ascii_case(&stored_name) {
                total = Some(users.max(0) as u64);
            } else {
                overlaps.push(OverlapEntry::new(overlap, users.max(0) as u64));
            }
        }

        let total_participants = total
            .with_context(|| format!("drilldown for {stored_name} has no self row"))?;

        Ok(Some(DrilldownRecord {
            community: stored_name,
            total_participants,
            overlaps,
        }))
    }

    /// Persist a drilldown record with its self row in one transaction.
    /// Returns false if a record for the community already existed.
    pub async fn save_drilldown(&self, record: &DrilldownRecord) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT OR IGNORE INTO drilldowns (community, created_at) VALUES (?, ?)")
            .bind(&record.community)
            .bind(now_unix())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let self_row = OverlapEntry::new(record.community.clone(), record.total_participants);
        let rows: Vec<&OverlapEntry> = std::iter::once(&self_row).chain(record.overlaps.iter()).collect();

        for (chunk_index, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO drilldown_rows (community, overlap, users, position) "
            );
            qb.push_values(chunk.iter().enumerate(), |mut row, (i, entry)| {
                row.push_bind(record.community.as_str())
                    .push_bind(entry.community.as_str())
                    .push_bind(entry.participants as i64)
                    .push_bind((chunk_index * BATCH_SIZE + i) as i64);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Entry counts, logged when the cache is opened
    pub async fn stats(&self) -> Result<CacheStats> {
        let participants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
            .fetch_one(&self.pool)
            .await?;
        let drilldowns: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drilldowns")
            .fetch_one(&self.pool)
            .await?;
        Ok(CacheStats {
            participants: participants as u64,
            drilldowns: drilldowns as u64,
        })
    }
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
