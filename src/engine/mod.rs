//! Overlap discovery and similarity engine
//!
//! # Architecture
//!
//! One crawl pass runs leaf-first through these layers, each taking its
//! inputs as values and returning its outputs:
//!
//! - **corpus**: participants of the target community
//! - **user_cache**: each participant's activity, fetched once then stored
//! - **aggregate**: one vote per participant per community
//! - **rank**: filtered, descending overlap list
//! - **store** / **db_store**: drilldown and activity persistence
//! - **similarity**: score from two stored drilldowns
//!
//! [`OverlapEngine`] ties them together: a drilldown is computed at most once
//! per community and served from the store afterwards.

mod aggregate;
mod corpus;
mod db_store;
mod error;
mod progress;
mod rank;
mod similarity;
mod store;
mod user_cache;

pub use aggregate::{aggregate, OverlapTally};
pub use corpus::{build_corpus, CorpusLimits};
pub use error::EngineError;
pub use progress::{reporter, IndicatifProgress, NoopProgress, ProgressHandle, ProgressReporter};
pub use rank::{rank_overlaps, MIN_OVERLAP};
pub use similarity::similarity_score;
pub use store::OverlapStore;
pub use user_cache::{ActivityOrigin, ParticipantActivity, UserCache};

use tracing::{debug, info};

use crate::config::Banlist;
use crate::fault::RetryPolicy;
use crate::logging::RAW_TARGET;
use crate::model::DrilldownRecord;
use crate::source::{ContentSource, SourceError};

/// Attempts allowed when probing a target before crawling it
const VERIFY_ATTEMPTS: u32 = 3;

/// Crawl bounds
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub thread_limit: usize,
    pub overview_limit: usize,
    pub min_score: i64,
    pub participant_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thread_limit: 100,
            overview_limit: 100,
            min_score: 1,
            participant_cap: 1000,
        }
    }
}

impl EngineConfig {
    pub fn corpus_limits(&self) -> CorpusLimits {
        CorpusLimits {
            thread_limit: self.thread_limit,
            min_score: self.min_score,
            participant_cap: self.participant_cap,
        }
    }
}

pub struct OverlapEngine<S, D> {
    source: S,
    store: D,
    config: EngineConfig,
    banlist: Banlist,
    retry: RetryPolicy,
    users: UserCache,
    progress: Box<dyn ProgressReporter>,
}

impl<S: ContentSource, D: OverlapStore> OverlapEngine<S, D> {
    pub fn new(source: S, store: D, config: EngineConfig) -> Self {
        let retry = RetryPolicy::default();
        let users = UserCache::new(config.overview_limit, retry.clone());
        Self {
            source,
            store,
            config,
            banlist: Banlist::default(),
            retry,
            users,
            progress: Box::new(NoopProgress),
        }
    }

    pub fn with_banlist(mut self, banlist: Banlist) -> Self {
        self.banlist = banlist;
        self
    }

    /// Policy for every remote call; the attempt bound is dropped for
    /// crawl calls, which retry until the remote answers definitively
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        let crawl = RetryPolicy { max_attempts: None, ..retry };
        self.users = UserCache::new(self.config.overview_limit, crawl.clone());
        self.retry = crawl;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn banlist(&self) -> &Banlist {
        &self.banlist
    }

    /// Probe a target before crawling it: private, banned and nonexistent
    /// communities become skips.
    pub async fn verify_community(&self, community: &str) -> Result<(), EngineError> {
        let source = &self.source;
        let probe = self
            .retry
            .clone()
            .with_max_attempts(VERIFY_ATTEMPTS)
            .run("verify", move || source.hot_threads(community, None, 1))
            .await;

        match probe {
            Ok(_) => Ok(()),
            Err(err) if err.is_forbidden() => Err(EngineError::skip(community, "community is private")),
            Err(err) if err.is_not_found() || err == SourceError::Redirect => {
                Err(EngineError::skip(community, "community is banned or does not exist"))
            }
            Err(err) => Err(EngineError::from_source(community, err)),
        }
    }

    /// Run one full crawl pass for `community` without touching the
    /// drilldown store.
    pub async fn crawl(&self, community: &str) -> Result<DrilldownRecord, EngineError> {
        info!(community, "collecting participants");
        let participants = build_corpus(
            &self.source,
            community,
            &self.config.corpus_limits(),
            &self.retry,
            self.progress.as_ref(),
        )
        .await
        .map_err(|err| EngineError::from_source(community, err))?;

        info!(community, participants = participants.len(), "scanning for overlapping communities");
        let pb = self.progress.start("Participants", participants.len() as u64);
        let mut tally = OverlapTally::new();
        let mut fetched = 0usize;
        for user in &participants {
            let activity = self.users.activity(&self.source, &self.store, user).await?;
            if activity.origin == ActivityOrigin::Remote {
                fetched += 1;
            }
            tally.record_participant(&activity.records, self.config.min_score);
            pb.inc(1);
            pb.set_message(format!("{fetched} fetched, {} communities seen", tally.observed().len()));
        }
        pb.finish();

        debug!(target: RAW_TARGET, community, participants = ?participants, "participant corpus");
        debug!(
            target: RAW_TARGET,
            community,
            tally = ?tally.iter().collect::<Vec<_>>(),
            "overlap tally"
        );

        let overlaps = rank_overlaps(community, &tally);
        debug!(target: RAW_TARGET, community, ranked = ?overlaps, "ranked overlaps");
        info!(
            community,
            fetched,
            observed = tally.observed().len(),
            ranked = overlaps.len(),
            "overlap pass complete"
        );

        Ok(DrilldownRecord {
            community: community.to_string(),
            total_participants: participants.len() as u64,
            overlaps,
        })
    }

    /// Stored drilldown for `community`, crawling and persisting it on
    /// first request. Stored records are returned as-is, however old.
    pub async fn drilldown(&self, community: &str) -> Result<DrilldownRecord, EngineError> {
        if let Some(record) = self.store.load_drilldown(community).await? {
            debug!(community, "drilldown served from cache");
            return Ok(record);
        }

        let record = self.crawl(community).await?;
        let stored = self.store.persist_drilldown(record).await?;
        info!(community, total = stored.total_participants, "drilldown stored");
        Ok(stored)
    }

    /// Drilldown for a community requested only as a comparison target.
    /// A banlisted community is never crawled on demand.
    pub async fn comparison_drilldown(&self, community: &str) -> Result<DrilldownRecord, EngineError> {
        if let Some(record) = self.store.load_drilldown(community).await? {
            return Ok(record);
        }
        if self.banlist.contains(community) {
            return Err(EngineError::Banlisted(community.to_string()));
        }
        self.drilldown(community).await
    }

    /// Similarity of `second` to `first`, as `(second, score)`
    pub async fn similarity(&self, first: &str, second: &str) -> Result<(String, f64), EngineError> {
        let a = self.drilldown(first).await?;
        let b = self.comparison_drilldown(second).await?;

        let ab = a.overlap_with(second);
        let ba = b.overlap_with(first);

        similarity_score(a.total_participants, b.total_participants, ab, ba)
            .map(|score| (second.to_string(), score))
            .ok_or_else(|| EngineError::NoOverlap {
                first: first.to_string(),
                second: second.to_string(),
            })
    }

    /// Similarity of `target` to each of its ranked overlaps, best first.
    ///
    /// Banlisted communities and those that signal a skip are left out;
    /// at most `limit` scores are computed.
    pub async fn similarity_table(&self, target: &str, limit: usize) -> Result<Vec<(String, f64)>, EngineError> {
        let record = self.drilldown(target).await?;
        let mut table = Vec::new();

        for entry in &record.overlaps {
            if table.len() >= limit {
                break;
            }
            if self.banlist.contains(&entry.community) {
                continue;
            }

            match self.similarity(target, &entry.community).await {
                Ok(pair) => table.push(pair),
                Err(err) if err.is_skip() => {
                    info!(target, other = %entry.community, reason = %err, "similarity skipped");
                }
                Err(err) => return Err(err),
            }
        }

        table.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(table)
    }
}
