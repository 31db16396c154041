//! Participant corpus for a target community
//!
//! Walks the community's hot threads and their comment trees, collecting
//! distinct authors of qualifying content until the thread limit is reached
//! or the corpus grows past its cap.

use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::fault::{classify, FaultClass, RetryPolicy};
use crate::model::flatten_comments;
use crate::source::{ContentSource, SourceError};

use super::progress::ProgressReporter;

/// Largest page requested from the listing endpoint
const PAGE_SIZE: usize = 100;

/// Bounds for one corpus build
#[derive(Debug, Clone, Copy)]
pub struct CorpusLimits {
    /// Maximum threads to walk
    pub thread_limit: usize,
    /// Content must score strictly above this for its author to count
    pub min_score: i64,
    /// Stop once the corpus holds more than this many participants
    pub participant_cap: usize,
}

/// Ordered, deduplicated participant list under construction
struct CorpusBuilder {
    participants: Vec<String>,
    seen: FxHashSet<String>,
    min_score: i64,
    cap: usize,
}

impl CorpusBuilder {
    fn new(limits: &CorpusLimits) -> Self {
        Self {
            participants: Vec::new(),
            seen: FxHashSet::default(),
            min_score: limits.min_score,
            cap: limits.participant_cap,
        }
    }

    /// Consider one author; returns true once the corpus is past its cap
    fn offer(&mut self, author: Option<&str>, score: i64) -> bool {
        if let Some(author) = author
            && score > self.min_score
            && !self.seen.contains(author)
        {
            self.seen.insert(author.to_string());
            self.participants.push(author.to_string());
        }
        self.participants.len() > self.cap
    }

    fn len(&self) -> usize {
        self.participants.len()
    }

    fn finish(self) -> Vec<String> {
        self.participants
    }
}

/// Collect the participants of `community`.
///
/// Partial results are returned when the cap is exceeded. Retryable faults
/// are retried per `retry`. A thread whose comments cannot be fetched is
/// skipped; a listing fault or a fatal fault is returned to the caller.
pub async fn build_corpus<S: ContentSource>(
    source: &S,
    community: &str,
    limits: &CorpusLimits,
    retry: &RetryPolicy,
    progress: &dyn ProgressReporter,
) -> Result<Vec<String>, SourceError> {
    let mut corpus = CorpusBuilder::new(limits);
    let pb = progress.start("Threads", limits.thread_limit as u64);
    let mut after: Option<String> = None;
    let mut walked = 0usize;

    'pages: while walked < limits.thread_limit {
        let page_size = (limits.thread_limit - walked).min(PAGE_SIZE);
        let cursor = after.as_deref();
        let page = retry
            .run("hot_threads", move || source.hot_threads(community, cursor, page_size))
            .await?;

        if page.threads.is_empty() {
            break;
        }

        for thread in page.threads.iter().take(limits.thread_limit - walked) {
            walked += 1;
            pb.inc(1);

            if corpus.offer(thread.author.as_deref(), thread.score) {
                break 'pages;
            }

            let thread_id = thread.id.as_str();
            let comments = match retry
                .run("thread_comments", move || source.thread_comments(thread_id))
                .await
            {
                Ok(comments) => comments,
                Err(err) if classify(&err) == FaultClass::Fatal => return Err(err),
                Err(err) => {
                    warn!(community, thread = thread_id, error = %err, "comments unavailable, skipping thread");
                    continue;
                }
            };

            for comment in flatten_comments(&comments) {
                if corpus.offer(comment.author.as_deref(), comment.score) {
                    break 'pages;
                }
            }

            pb.set_message(format!("{} participants", corpus.len()));
            debug!(community, thread = thread_id, participants = corpus.len(), "thread walked");
        }

        match page.after {
            Some(next) => after = Some(next),
            None => break,
        }
    }

    pb.finish();
    info!(community, threads = walked, participants = corpus.len(), "participant corpus built");
    Ok(corpus.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NoopProgress;
    use crate::model::{Comment, Thread};
    use crate::source::MemorySource;

    fn thread(id: &str, author: Option<&str>, score: i64) -> Thread {
        Thread { id: id.into(), author: author.map(str::to_string), score }
    }

    fn limits(thread_limit: usize, participant_cap: usize) -> CorpusLimits {
        CorpusLimits { thread_limit, min_score: 1, participant_cap }
    }

    async fn build(source: &MemorySource, limits: CorpusLimits) -> Result<Vec<String>, SourceError> {
        build_corpus(source, "alpha", &limits, &RetryPolicy::immediate(), &NoopProgress).await
    }

    #[tokio::test]
    async fn test_dedups_and_filters_by_score() {
        let source = MemorySource::new()
            .with_thread("alpha", thread("t1", Some("op"), 10), vec![
                Comment::new("c1", Some("ann"), 2).with_replies(vec![
                    Comment::new("c2", Some("op"), 5),
                    Comment::new("c3", Some("low"), 1),
                ]),
                Comment::new("c4", None, 50),
            ])
            .with_thread("alpha", thread("t2", Some("ann"), 3), vec![
                Comment::new("c5", Some("bea"), 4),
            ]);

        let corpus = build(&source, limits(10, 100)).await.unwrap();
        assert_eq!(corpus, vec!["op", "ann", "bea"]);
    }

    #[tokio::test]
    async fn test_stops_once_past_cap() {
        let source = MemorySource::new()
            .with_thread("alpha", thread("t1", Some("a"), 10), vec![
                Comment::new("c1", Some("b"), 5),
                Comment::new("c2", Some("c"), 5),
                Comment::new("c3", Some("d"), 5),
            ])
            .with_thread("alpha", thread("t2", Some("e"), 10), vec![]);

        let corpus = build(&source, limits(10, 2)).await.unwrap();
        assert_eq!(corpus, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_respects_thread_limit_across_pages() {
        let mut source = MemorySource::new();
        for i in 0..250 {
            let id = format!("t{i}");
            let author = format!("u{i}");
            source = source.with_thread("alpha", thread(&id, Some(&author), 10), vec![]);
        }

        let corpus = build(&source, limits(130, 10_000)).await.unwrap();
        assert_eq!(corpus.len(), 130);
        assert_eq!(source.listing_calls("alpha"), 2);
    }

    #[tokio::test]
    async fn test_retries_transient_listing_faults() {
        let source = MemorySource::new()
            .with_thread("alpha", thread("t1", Some("a"), 10), vec![])
            .fail_listing("alpha", SourceError::Timeout)
            .fail_listing("alpha", SourceError::RateLimited { retry_after: None });

        let corpus = build(&source, limits(5, 10)).await.unwrap();
        assert_eq!(corpus, vec!["a"]);
        assert_eq!(source.listing_calls("alpha"), 3);
    }

    #[tokio::test]
    async fn test_removed_thread_is_skipped() {
        let source = MemorySource::new()
            .with_thread("alpha", thread("t1", Some("a"), 10), vec![])
            .with_thread("alpha", thread("t2", Some("b"), 10), vec![Comment::new("c1", Some("lost"), 9)])
            .with_thread("alpha", thread("t3", Some("c"), 10), vec![])
            .fail_comments("t2", SourceError::status(404));

        let corpus = build(&source, limits(10, 100)).await.unwrap();
        assert_eq!(corpus, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_fatal_comment_fault_surfaces() {
        let source = MemorySource::new()
            .with_thread("alpha", thread("t1", Some("a"), 10), vec![])
            .fail_comments("t1", SourceError::Unauthorized);

        assert_eq!(build(&source, limits(10, 100)).await, Err(SourceError::Unauthorized));
    }

    #[tokio::test]
    async fn test_permanent_fault_surfaces() {
        let source = MemorySource::new().fail_listing("alpha", SourceError::status(403));
        assert_eq!(build(&source, limits(5, 10)).await, Err(SourceError::status(403)));
    }
}
