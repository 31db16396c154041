//! Crawl progress display
//!
//! The pipeline reports through [`ProgressReporter`] so it never touches the
//! terminal itself. Bars show the stage as a prefix and running participant
//! counts as the message.

use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} {prefix:>12.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// A running stage of a crawl pass
pub trait ProgressHandle: Send + Sync {
    fn inc(&self, n: u64);
    /// Running counts, e.g. "42 participants"
    fn set_message(&self, msg: String);
    fn finish(&self);
}

pub trait ProgressReporter: Send + Sync {
    /// Begin a stage named `stage` expecting `total` steps
    fn start(&self, stage: &str, total: u64) -> Box<dyn ProgressHandle>;
}

/// Terminal bars for interactive runs
pub struct IndicatifProgress;

impl ProgressReporter for IndicatifProgress {
    fn start(&self, stage: &str, total: u64) -> Box<dyn ProgressHandle> {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        let bar = ProgressBar::new(total)
            .with_style(style)
            .with_prefix(stage.to_string());
        Box::new(StageBar(bar))
    }
}

struct StageBar(ProgressBar);

impl ProgressHandle for StageBar {
    fn inc(&self, n: u64) {
        self.0.inc(n);
    }

    fn set_message(&self, msg: String) {
        self.0.set_message(msg);
    }

    fn finish(&self) {
        self.0.finish_and_clear();
    }
}

/// Reports nothing; used by tests and `--quiet`
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn start(&self, _stage: &str, _total: u64) -> Box<dyn ProgressHandle> {
        Box::new(NoopProgress)
    }
}

impl ProgressHandle for NoopProgress {
    fn inc(&self, _n: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self) {}
}

pub fn reporter(show_bars: bool) -> Box<dyn ProgressReporter> {
    if show_bars {
        Box::new(IndicatifProgress)
    } else {
        Box::new(NoopProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses() {
        assert!(ProgressStyle::with_template(BAR_TEMPLATE).is_ok());
    }
}
