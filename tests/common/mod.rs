// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use subdrill::engine::{EngineConfig, OverlapEngine};
use subdrill::fault::RetryPolicy;
use subdrill::model::{ActivityRecord, DrilldownRecord, ItemKind, OverlapEntry, Thread};
use subdrill::repository::Database;
use subdrill::source::MemorySource;

/// Create an in-memory test database with initialized schema
pub async fn create_test_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

pub fn thread(id: &str, author: &str, score: i64) -> Thread {
    Thread { id: id.to_string(), author: Some(author.to_string()), score }
}

pub fn activity(community: &str, score: i64) -> ActivityRecord {
    ActivityRecord::new(community, ItemKind::Comment, format!("{community}_{score}"), score)
}

/// Give each user one qualifying thread in `community`
pub fn with_participant_threads(mut source: MemorySource, community: &str, users: &[String]) -> MemorySource {
    for user in users {
        let id = format!("{community}_{user}");
        source = source.with_thread(community, thread(&id, user, 10), vec![]);
    }
    source
}

/// Give each user an overview with one qualifying item per community
pub fn with_overviews(mut source: MemorySource, users: &[String], communities: &[&str]) -> MemorySource {
    for user in users {
        let records = communities.iter().map(|c| activity(c, 5)).collect();
        source = source.with_overview(user, records);
    }
    source
}

pub fn names(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("{prefix}{i}")).collect()
}

pub fn drilldown(community: &str, total: u64, overlaps: &[(&str, u64)]) -> DrilldownRecord {
    DrilldownRecord {
        community: community.to_string(),
        total_participants: total,
        overlaps: overlaps.iter().map(|(c, n)| OverlapEntry::new(*c, *n)).collect(),
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        thread_limit: 100,
        overview_limit: 100,
        min_score: 1,
        participant_cap: 1000,
    }
}

/// Engine over an in-memory store that never sleeps between retries
pub async fn test_engine(source: MemorySource) -> OverlapEngine<MemorySource, Database> {
    engine_with_db(source, create_test_db().await)
}

pub fn engine_with_db(source: MemorySource, db: Database) -> OverlapEngine<MemorySource, Database> {
    OverlapEngine::new(source, db, test_config()).with_retry(RetryPolicy::immediate())
}
