//! Remote content-platform access
//!
//! The pipeline only talks to the platform through [`ContentSource`], so the
//! crawl can run against the live client or a scripted in-memory one.

mod memory;
mod reddit;

pub use memory::MemorySource;
pub use reddit::RedditClient;

use std::time::Duration;

use thiserror::Error;

use crate::model::{ActivityRecord, Comment, ThreadPage};

/// Structured remote fault
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("rate limited by remote")]
    RateLimited { retry_after: Option<Duration> },

    #[error("remote returned status {code}")]
    Status { code: u16 },

    #[error("remote redirected, target does not exist")]
    Redirect,

    #[error("authentication rejected")]
    Unauthorized,

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn status(code: u16) -> Self {
        SourceError::Status { code }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::Status { code: 404 })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, SourceError::Status { code: 403 })
    }

    /// Server-provided cooldown, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SourceError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_decode() {
            SourceError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::status(status.as_u16())
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

/// Read access to a content platform
#[allow(async_fn_in_trait)]
pub trait ContentSource {
    /// One page of a community's hot threads
    async fn hot_threads(
        &self,
        community: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<ThreadPage, SourceError>;

    /// The full comment tree of a thread, collapsed stubs expanded
    async fn thread_comments(&self, thread_id: &str) -> Result<Vec<Comment>, SourceError>;

    /// Up to `limit` items of a participant's activity overview
    async fn user_overview(&self, user: &str, limit: usize) -> Result<Vec<ActivityRecord>, SourceError>;
}
