mod format;
mod report;

pub use format::{format_month, format_report, format_score, report_title, REPORT_BUDGET};
pub use report::append_results;
