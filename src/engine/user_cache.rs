//! Per-participant activity cache
//!
//! A participant's overview is fetched once and persisted; from then on the
//! stored rows are authoritative. Participants whose profile is gone
//! (shadow-banned, deleted, suspended) contribute no activity and are not
//! asked for again while this cache lives.

use std::sync::Mutex;

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::fault::{classify, FaultClass, RetryPolicy};
use crate::model::ActivityRecord;
use crate::repository::ParticipantLookup;
use crate::source::ContentSource;

use super::error::EngineError;
use super::store::OverlapStore;

/// Where a participant's activity came from
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ActivityOrigin {
    Cache,
    Remote,
    /// Profile unavailable; activity is empty
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct ParticipantActivity {
    pub origin: ActivityOrigin,
    pub records: Vec<ActivityRecord>,
}

impl ParticipantActivity {
    fn unavailable() -> Self {
        Self { origin: ActivityOrigin::Unavailable, records: Vec::new() }
    }
}

pub struct UserCache {
    overview_limit: usize,
    retry: RetryPolicy,
    unavailable: Mutex<FxHashSet<String>>,
}

impl UserCache {
    pub fn new(overview_limit: usize, retry: RetryPolicy) -> Self {
        Self {
            overview_limit,
            retry,
            unavailable: Mutex::new(FxHashSet::default()),
        }
    }

    fn is_unavailable(&self, user: &str) -> bool {
        self.unavailable.lock().map(|set| set.contains(user)).unwrap_or(false)
    }

    fn mark_unavailable(&self, user: &str) {
        if let Ok(mut set) = self.unavailable.lock() {
            set.insert(user.to_string());
        }
    }

    /// Activity of `user`, from the store when present, otherwise fetched
    /// and persisted.
    pub async fn activity<S, D>(&self, source: &S, store: &D, user: &str) -> Result<ParticipantActivity, EngineError>
    where
        S: ContentSource,
        D: OverlapStore,
    {
        match store.load_activity(user).await? {
            ParticipantLookup::Hit(records) => {
                return Ok(ParticipantActivity { origin: ActivityOrigin::Cache, records });
            }
            ParticipantLookup::Corrupt(reason) => {
                warn!(user, %reason, "unreadable cache entry, dropping it");
                store.forget_participant(user).await?;
            }
            ParticipantLookup::Missing => {}
        }

        if self.is_unavailable(user) {
            return Ok(ParticipantActivity::unavailable());
        }

        let limit = self.overview_limit;
        let fetched = self
            .retry
            .run("user_overview", move || source.user_overview(user, limit))
            .await;

        let records = match fetched {
            Ok(records) => records,
            Err(err) if err.is_not_found() || err.is_forbidden() => {
                debug!(user, error = %err, "profile unavailable, treating as shadow-banned");
                self.mark_unavailable(user);
                return Ok(ParticipantActivity::unavailable());
            }
            Err(err) if classify(&err) == FaultClass::Fatal => return Err(EngineError::Fatal(err)),
            Err(err) => {
                warn!(user, error = %err, "overview fetch gave up, excluding participant");
                self.mark_unavailable(user);
                return Ok(ParticipantActivity::unavailable());
            }
        };

        if !store.save_activity(user, &records).await? {
            debug!(user, "activity already cached by another writer");
        }
        Ok(ParticipantActivity { origin: ActivityOrigin::Remote, records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemKind;
    use crate::repository::Database;
    use crate::source::{MemorySource, SourceError};

    async fn store() -> Database {
        let db = Database::new(":memory:").await.unwrap();
        db.init_schema().await.unwrap();
        db
    }

    fn rows() -> Vec<ActivityRecord> {
        vec![
            ActivityRecord::new("beta", ItemKind::Comment, "c1", 4),
            ActivityRecord::new("gamma", ItemKind::Thread, "t1", 12),
        ]
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_store() {
        let source = MemorySource::new().with_overview("ann", rows());
        let db = store().await;
        let cache = UserCache::new(100, RetryPolicy::immediate());

        let first = cache.activity(&source, &db, "ann").await.unwrap();
        let second = cache.activity(&source, &db, "ann").await.unwrap();

        assert_eq!(first.origin, ActivityOrigin::Remote);
        assert_eq!(second.origin, ActivityOrigin::Cache);
        assert_eq!(first.records, second.records);
        assert_eq!(source.overview_calls("ann"), 1);
    }

    #[tokio::test]
    async fn test_missing_profile_remembered() {
        let source = MemorySource::new().fail_overview("ghost", SourceError::status(403));
        let db = store().await;
        let cache = UserCache::new(100, RetryPolicy::immediate());

        for _ in 0..3 {
            let activity = cache.activity(&source, &db, "ghost").await.unwrap();
            assert_eq!(activity.origin, ActivityOrigin::Unavailable);
            assert!(activity.records.is_empty());
        }
        assert_eq!(source.overview_calls("ghost"), 1);
        assert!(!db.is_participant_cached("ghost").await);
    }

    #[tokio::test]
    async fn test_exhausted_retries_exclude_participant() {
        let source = MemorySource::new()
            .with_overview("ann", rows())
            .fail_overview("ann", SourceError::Timeout)
            .fail_overview("ann", SourceError::Timeout);
        let db = store().await;
        let cache = UserCache::new(100, RetryPolicy::immediate().with_max_attempts(2));

        let activity = cache.activity(&source, &db, "ann").await.unwrap();

        assert_eq!(activity.origin, ActivityOrigin::Unavailable);
        assert_eq!(source.overview_calls("ann"), 2);
    }
}
