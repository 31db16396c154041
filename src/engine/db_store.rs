//! Database implementation of OverlapStore

use anyhow::Result;

use crate::model::{ActivityRecord, DrilldownRecord};
use crate::repository::{Database, ParticipantLookup};

use super::store::OverlapStore;

impl OverlapStore for Database {
    async fn load_activity(&self, participant: &str) -> Result<ParticipantLookup> {
        self.load_participant(participant).await
    }

    async fn save_activity(&self, participant: &str, records: &[ActivityRecord]) -> Result<bool> {
        self.save_participant(participant, records).await
    }

    async fn forget_participant(&self, participant: &str) -> Result<()> {
        self.delete_participant(participant).await
    }

    async fn load_drilldown(&self, community: &str) -> Result<Option<DrilldownRecord>> {
        Database::load_drilldown(self, community).await
    }

    async fn insert_drilldown(&self, record: &DrilldownRecord) -> Result<bool> {
        self.save_drilldown(record).await
    }
}
