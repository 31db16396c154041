//! Overlap store trait for persistence abstraction
//!
//! Decouples the crawl pipeline from database implementation details.

use anyhow::{Context, Result};

use crate::model::{ActivityRecord, DrilldownRecord};
use crate::repository::ParticipantLookup;

/// Persistence layer for per-participant activity and drilldown records
///
/// Both kinds of entry are create-if-absent: once written they are never
/// mutated, only deleted when found unreadable.
#[allow(async_fn_in_trait)]
pub trait OverlapStore {
    /// Look up a participant's cached activity
    async fn load_activity(&self, participant: &str) -> Result<ParticipantLookup>;

    /// Persist a participant's activity; false if an entry already existed
    async fn save_activity(&self, participant: &str, records: &[ActivityRecord]) -> Result<bool>;

    /// Drop a participant's entry so the next lookup misses
    async fn forget_participant(&self, participant: &str) -> Result<()>;

    /// Load the drilldown for a community, if one was stored
    async fn load_drilldown(&self, community: &str) -> Result<Option<DrilldownRecord>>;

    /// Atomically insert a drilldown; false if one already existed
    async fn insert_drilldown(&self, record: &DrilldownRecord) -> Result<bool>;

    /// Store `record` unless another writer got there first, and return
    /// whichever record ends up persisted.
    async fn persist_drilldown(&self, record: DrilldownRecord) -> Result<DrilldownRecord> {
        if self.insert_drilldown(&record).await? {
            return Ok(record);
        }
        self.load_drilldown(&record.community)
            .await?
            .with_context(|| format!("drilldown for {} vanished after insert conflict", record.community))
    }
}
