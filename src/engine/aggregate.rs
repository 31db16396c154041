//! Overlap aggregation
//!
//! Folds participants' activity into per-community counts of distinct
//! participants. A tally belongs to exactly one crawl pass.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::ActivityRecord;

/// Distinct-participant counts per community, in first-observed order
#[derive(Debug, Default, Clone)]
pub struct OverlapTally {
    counts: FxHashMap<String, u64>,
    observed: Vec<String>,
    participants: u64,
}

impl OverlapTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one participant's activity in. Each community gets at most one
    /// vote per participant; only rows scoring above `min_score` count.
    pub fn record_participant(&mut self, records: &[ActivityRecord], min_score: i64) {
        let mut voted: FxHashSet<&str> = FxHashSet::default();

        for record in records {
            if record.score <= min_score || !voted.insert(record.community.as_str()) {
                continue;
            }
            match self.counts.get_mut(record.community.as_str()) {
                Some(count) => *count += 1,
                None => {
                    self.counts.insert(record.community.clone(), 1);
                    self.observed.push(record.community.clone());
                }
            }
        }

        self.participants += 1;
    }

    pub fn count(&self, community: &str) -> u64 {
        self.counts.get(community).copied().unwrap_or(0)
    }

    /// Every community seen above the score floor, first occurrence first
    pub fn observed(&self) -> &[String] {
        &self.observed
    }

    /// (community, count) pairs in first-observed order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.observed.iter().map(|c| (c.as_str(), self.count(c)))
    }

    /// Number of participants folded in, shadow-banned ones included
    pub fn participants(&self) -> u64 {
        self.participants
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}

/// Build a fresh tally from a pass worth of participant activity
pub fn aggregate<'a, I>(participants: I, min_score: i64) -> OverlapTally
where
    I: IntoIterator<Item = &'a [ActivityRecord]>,
{
    let mut tally = OverlapTally::new();
    for records in participants {
        tally.record_participant(records, min_score);
    }
    tally
}
