mod activity;
mod drilldown;
mod thread;

pub use activity::{ActivityRecord, ItemKind};
pub use drilldown::{DrilldownRecord, OverlapEntry};
pub use thread::{flatten_comments, Comment, Thread, ThreadPage};
