use thiserror::Error;

use crate::fault::{classify, FaultClass};
use crate::source::SourceError;

/// Outcome of a failed engine operation
#[derive(Debug, Error)]
pub enum EngineError {
    /// Target is unusable (invalid, private, banned, removed); move on
    #[error("skipping {community}: {reason}")]
    Skip { community: String, reason: String },

    /// Comparison target is banlisted and has no stored drilldown
    #[error("{0} is banlisted")]
    Banlisted(String),

    /// Neither drilldown records the other community; unknown, not zero
    #[error("cannot compute similarity of {first} and {second}: never co-observed")]
    NoOverlap { first: String, second: String },

    #[error("fatal remote fault: {0}")]
    Fatal(#[source] SourceError),

    #[error("cache store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    /// Map a remote fault that escaped its retry policy
    pub fn from_source(community: &str, err: SourceError) -> Self {
        match classify(&err) {
            FaultClass::Fatal => EngineError::Fatal(err),
            FaultClass::Skip | FaultClass::Retryable => EngineError::Skip {
                community: community.to_string(),
                reason: err.to_string(),
            },
        }
    }

    pub fn skip(community: &str, reason: impl Into<String>) -> Self {
        EngineError::Skip {
            community: community.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller should proceed to its next target
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            EngineError::Skip { .. } | EngineError::Banlisted(_) | EngineError::NoOverlap { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_))
    }
}
