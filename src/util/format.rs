//! Plain-text drilldown reports

use std::fmt::Write;

use time::OffsetDateTime;
use time::macros::format_description;

use crate::config::Banlist;
use crate::model::DrilldownRecord;

/// Stop adding rows once a report grows past this many bytes
pub const REPORT_BUDGET: usize = 14_000;

/// Similarity rows stop earlier so the overlap table always fits
const SIMILARITY_BUDGET: usize = 1_000;

/// Format a similarity score with five decimals
pub fn format_score(score: f64) -> String {
    format!("{:.5}", score)
}

/// Format a Unix timestamp as "Month YYYY"
pub fn format_month(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|dt| dt.format(&format_description!("[month repr:long] [year]")).ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Report title, flagging reports made without a banlist
pub fn report_title(community: &str, timestamp: i64, banlist_active: bool) -> String {
    let mut title = format!("/r/{} Drilldown {}", community, format_month(timestamp));
    if !banlist_active {
        title.push_str(" (Subreddit Bans Disabled)");
    }
    title
}

/// Render a drilldown with an optional similarity table.
/// Banlisted communities are left out of the overlap table.
pub fn format_report(
    title: &str,
    record: &DrilldownRecord,
    similarity: &[(String, f64)],
    banlist: &Banlist,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}\n");

    if !similarity.is_empty() {
        let _ = writeln!(out, "{:<32} {:>10}", "Subreddit", "Similarity");
        for (community, score) in similarity {
            let _ = writeln!(out, "{:<32} {:>10}", format!("/r/{community}"), format_score(*score));
            if out.len() >= SIMILARITY_BUDGET {
                break;
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Of {} Users Found:\n", record.total_participants);
    let _ = writeln!(out, "{:<32} {:>10}", "Subreddit", "Overlapping users");
    for entry in &record.overlaps {
        if banlist.contains(&entry.community) {
            continue;
        }
        let _ = writeln!(out, "{:<32} {:>10}", format!("/r/{}", entry.community), entry.participants);
        if out.len() >= REPORT_BUDGET {
            break;
        }
    }

    out
}
