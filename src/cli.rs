use clap::Parser;
use std::path::PathBuf;

use crate::config::Settings;

/// Words that end an interactive session
pub const QUIT_WORDS: [&str; 3] = ["quit", ".quit", "q"];

pub fn is_quit(word: &str) -> bool {
    QUIT_WORDS.contains(&word)
}

#[derive(Parser, Debug, Default)]
#[command(name = "subdrill", about = "Find communities that share a user base")]
pub struct Cli {
    /// Communities to analyze; prompts interactively when omitted
    pub targets: Vec<String>,

    /// JSON settings file
    #[arg(long, short)]
    pub settings: Option<PathBuf>,

    /// Cache database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Hot threads walked per target
    #[arg(long)]
    pub scrape_limit: Option<usize>,

    /// Overview items fetched per participant
    #[arg(long)]
    pub overview_limit: Option<usize>,

    /// Participant sample cap
    #[arg(long)]
    pub user_limit: Option<usize>,

    /// Ignore content at or below this score
    #[arg(long, allow_hyphen_values = true)]
    pub min_score: Option<i64>,

    /// Banlist file
    #[arg(long)]
    pub banlist: Option<PathBuf>,

    /// Run without a banlist
    #[arg(long)]
    pub no_banlist: bool,

    /// Skip similarity scores
    #[arg(long)]
    pub no_similarity: bool,

    /// Directory for report copies
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Append errors to this file
    #[arg(long)]
    pub error_log: Option<PathBuf>,

    /// Append raw participant lists and overlap tallies to this file
    #[arg(long)]
    pub raw_log: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Hide progress bars
    #[arg(long, short)]
    pub quiet: bool,
}

impl Cli {
    /// Overlay flags onto file settings
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(db) = &self.db {
            settings.db_path = Some(db.clone());
        }
        if let Some(n) = self.scrape_limit {
            settings.scrape_limit = n;
        }
        if let Some(n) = self.overview_limit {
            settings.overview_limit = n;
        }
        if let Some(n) = self.user_limit {
            settings.user_limit = n;
        }
        if let Some(n) = self.min_score {
            settings.min_score = n;
        }
        if let Some(path) = &self.banlist {
            settings.banlist_path = path.clone();
        }
        if self.no_banlist {
            settings.banlist_enabled = false;
        }
        if self.no_similarity {
            settings.similarity = false;
        }
        if let Some(dir) = &self.results_dir {
            settings.results_dir = dir.clone();
        }
        if let Some(path) = &self.error_log {
            settings.error_log = Some(path.clone());
        }
        if let Some(path) = &self.raw_log {
            settings.raw_log = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from(["subdrill", "--scrape-limit", "7", "--no-banlist", "--min-score", "-3", "rust"]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(cli.targets, vec!["rust"]);
        assert_eq!(settings.scrape_limit, 7);
        assert_eq!(settings.min_score, -3);
        assert!(!settings.banlist_enabled);
        assert!(settings.similarity);
        assert!(settings.raw_log.is_none());
    }

    #[test]
    fn test_raw_log_flag() {
        let cli = Cli::parse_from(["subdrill", "--raw-log", "raw.txt"]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.raw_log, Some(PathBuf::from("raw.txt")));
    }

    #[test]
    fn test_quit_words() {
        assert!(is_quit("q"));
        assert!(is_quit(".quit"));
        assert!(!is_quit("Quit"));
        assert!(!is_quit("quitters"));
    }
}
