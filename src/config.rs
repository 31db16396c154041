//! Session settings and the community banlist

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use tracing::warn;

use crate::engine::EngineConfig;
use crate::fault::RetryPolicy;

/// Backoff settings for remote calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 5_000,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

/// Settings file contents; every field has a default
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Hot threads walked per target
    pub scrape_limit: usize,
    /// Overview items fetched per participant
    pub overview_limit: usize,
    /// Content at or below this score is ignored
    pub min_score: i64,
    /// Participant sample cap
    pub user_limit: usize,
    pub similarity: bool,
    /// Similarity scores computed per report
    pub similarity_limit: usize,
    pub banlist_enabled: bool,
    pub banlist_path: PathBuf,
    /// None resolves to the platform cache directory
    pub db_path: Option<PathBuf>,
    /// Where report copies are appended
    pub results_dir: PathBuf,
    /// Append ERROR-level events to this file
    pub error_log: Option<PathBuf>,
    /// Append each pass's participant list and overlap tally to this file
    pub raw_log: Option<PathBuf>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scrape_limit: 100,
            overview_limit: 100,
            min_score: 1,
            user_limit: 1000,
            similarity: true,
            similarity_limit: 50,
            banlist_enabled: true,
            banlist_path: PathBuf::from("banlist.txt"),
            db_path: None,
            results_dir: PathBuf::from("."),
            error_log: None,
            raw_log: None,
            user_agent: format!("subdrill/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            retry: RetrySettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read settings file: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            thread_limit: self.scrape_limit,
            overview_limit: self.overview_limit,
            min_score: self.min_score,
            participant_cap: self.user_limit,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::unbounded(
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
        .with_jitter(self.retry.jitter)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Database path, defaulting to `<cache dir>/subdrill/cache.db`
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }
        let cache_dir = dirs::cache_dir()
            .context("Could not determine cache directory")?
            .join("subdrill");
        fs::create_dir_all(&cache_dir)?;
        Ok(cache_dir.join("cache.db"))
    }

    /// The banlist this session uses; empty when disabled
    pub fn load_banlist(&self) -> Result<Banlist> {
        if !self.banlist_enabled {
            return Ok(Banlist::default());
        }
        if !self.banlist_path.is_file() {
            warn!(path = %self.banlist_path.display(), "banlist file not found, continuing without one");
            return Ok(Banlist::default());
        }
        Banlist::load(&self.banlist_path)
    }
}

/// Communities excluded from comparison. Membership ignores ASCII case,
/// like the drilldown store and overlap lookups.
#[derive(Debug, Clone, Default)]
pub struct Banlist {
    names: FxHashSet<String>,
}

impl Banlist {
    pub fn new<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    /// One name per line; blank lines and `#` comments are skipped
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read banlist: {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn contains(&self, community: &str) -> bool {
        self.names.contains(&community.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
