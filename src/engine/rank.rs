//! Rank building: filter and order an overlap tally

use crate::model::OverlapEntry;

use super::aggregate::OverlapTally;

/// Communities with fewer overlapping participants are left out of a drilldown
pub const MIN_OVERLAP: u64 = 5;

/// Rank a tally for `target`, most-shared community first.
///
/// The target itself (any casing) and communities below [`MIN_OVERLAP`] are
/// dropped. Equal counts keep first-observed order.
pub fn rank_overlaps(target: &str, tally: &OverlapTally) -> Vec<OverlapEntry> {
    let mut ranked: Vec<OverlapEntry> = tally
        .iter()
        .filter(|(community, count)| !community.eq_ignore_ascii_case(target) && *count >= MIN_OVERLAP)
        .map(|(community, count)| OverlapEntry::new(community, count))
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.participants.cmp(&a.participants));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aggregate::aggregate;
    use crate::model::{ActivityRecord, ItemKind};

    /// One participant per entry, each active in the listed communities
    fn tally_of(participants: &[&[&str]]) -> OverlapTally {
        let rows: Vec<Vec<ActivityRecord>> = participants
            .iter()
            .map(|subs| {
                subs.iter()
                    .map(|s| ActivityRecord::new(*s, ItemKind::Thread, "id", 10))
                    .collect()
            })
            .collect();
        aggregate(rows.iter().map(Vec::as_slice), 1)
    }

    fn repeat<'a>(subs: &'a [&'a str], n: usize) -> Vec<&'a [&'a str]> {
        std::iter::repeat_n(subs, n).collect()
    }

    #[test]
    fn test_excludes_target_any_case() {
        let tally = tally_of(&repeat(&["Alpha", "beta"], 6));
        let ranked = rank_overlaps("alpha", &tally);
        assert_eq!(ranked, vec![OverlapEntry::new("beta", 6)]);
    }

    #[test]
    fn test_threshold_boundary() {
        let mut participants = repeat(&["five", "four"], 4);
        participants.push(&["five"]);
        let tally = tally_of(&participants);

        let ranked = rank_overlaps("target", &tally);
        assert_eq!(ranked, vec![OverlapEntry::new("five", 5)]);
    }

    #[test]
    fn test_descending_with_stable_ties() {
        let mut participants = repeat(&["tie_a", "tie_b", "top"], 5);
        participants.extend(repeat(&["top"], 3));
        let tally = tally_of(&participants);

        let ranked = rank_overlaps("target", &tally);
        let names: Vec<_> = ranked.iter().map(|e| e.community.as_str()).collect();
        assert_eq!(names, vec!["top", "tie_a", "tie_b"]);
        assert_eq!(ranked[0].participants, 8);
    }

    #[test]
    fn test_empty_tally() {
        assert!(rank_overlaps("x", &OverlapTally::new()).is_empty());
    }
}
