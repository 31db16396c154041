/// One ranked overlap row of a drilldown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapEntry {
    pub community: String,
    pub participants: u64,
}

impl OverlapEntry {
    pub fn new(community: impl Into<String>, participants: u64) -> Self {
        Self { community: community.into(), participants }
    }
}

/// Ranked overlap report for one target community.
///
/// Written once and never updated; a later crawl that would produce
/// different numbers does not replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrilldownRecord {
    pub community: String,
    pub total_participants: u64,
    /// Descending by participants, self row excluded
    pub overlaps: Vec<OverlapEntry>,
}

impl DrilldownRecord {
    /// Overlap count recorded for `other`, if it made the ranking
    pub fn overlap_with(&self, other: &str) -> Option<u64> {
        self.overlaps
            .iter()
            .find(|e| e.community.eq_ignore_ascii_case(other))
            .map(|e| e.participants)
    }
}
