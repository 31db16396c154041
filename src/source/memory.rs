//! Scripted in-memory content source
//!
//! Serves fixed listings, comment trees and overviews, with per-key call
//! counters and queued faults so tests can drive retry and shadow-ban paths
//! without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::model::{ActivityRecord, Comment, Thread, ThreadPage};

use super::{ContentSource, SourceError};

#[derive(Default)]
pub struct MemorySource {
    threads: HashMap<String, Vec<Thread>>,
    comments: HashMap<String, Vec<Comment>>,
    overviews: HashMap<String, Vec<ActivityRecord>>,
    listing_faults: Mutex<HashMap<String, VecDeque<SourceError>>>,
    overview_faults: Mutex<HashMap<String, VecDeque<SourceError>>>,
    comment_faults: Mutex<HashMap<String, VecDeque<SourceError>>>,
    listing_calls: Mutex<HashMap<String, usize>>,
    overview_calls: Mutex<HashMap<String, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a thread to a community's hot listing
    pub fn with_thread(mut self, community: &str, thread: Thread, comments: Vec<Comment>) -> Self {
        self.comments.insert(thread.id.clone(), comments);
        self.threads.entry(community.to_string()).or_default().push(thread);
        self
    }

    /// Set a participant's overview; unknown participants return 404
    pub fn with_overview(mut self, user: &str, records: Vec<ActivityRecord>) -> Self {
        self.overviews.insert(user.to_string(), records);
        self
    }

    /// Queue a fault returned by the next listing call for `community`
    pub fn fail_listing(self, community: &str, err: SourceError) -> Self {
        push_fault(&self.listing_faults, community, err);
        self
    }

    /// Queue a fault returned by the next overview call for `user`
    pub fn fail_overview(self, user: &str, err: SourceError) -> Self {
        push_fault(&self.overview_faults, user, err);
        self
    }

    /// Queue a fault returned by the next comment fetch for `thread_id`
    pub fn fail_comments(self, thread_id: &str, err: SourceError) -> Self {
        push_fault(&self.comment_faults, thread_id, err);
        self
    }

    pub fn listing_calls(&self, community: &str) -> usize {
        count(&self.listing_calls, community)
    }

    pub fn overview_calls(&self, user: &str) -> usize {
        count(&self.overview_calls, user)
    }

    pub fn total_overview_calls(&self) -> usize {
        self.overview_calls.lock().map(|m| m.values().sum()).unwrap_or(0)
    }
}

fn push_fault(faults: &Mutex<HashMap<String, VecDeque<SourceError>>>, key: &str, err: SourceError) {
    if let Ok(mut map) = faults.lock() {
        map.entry(key.to_string()).or_default().push_back(err);
    }
}

fn pop_fault(faults: &Mutex<HashMap<String, VecDeque<SourceError>>>, key: &str) -> Option<SourceError> {
    faults.lock().ok()?.get_mut(key)?.pop_front()
}

fn bump(calls: &Mutex<HashMap<String, usize>>, key: &str) {
    if let Ok(mut map) = calls.lock() {
        *map.entry(key.to_string()).or_default() += 1;
    }
}

fn count(calls: &Mutex<HashMap<String, usize>>, key: &str) -> usize {
    calls
        .lock()
        .ok()
        .and_then(|m| m.get(key).copied())
        .unwrap_or(0)
}

impl ContentSource for MemorySource {
    async fn hot_threads(
        &self,
        community: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<ThreadPage, SourceError> {
        bump(&self.listing_calls, community);
        if let Some(err) = pop_fault(&self.listing_faults, community) {
            return Err(err);
        }

        let all = self.threads.get(community).ok_or(SourceError::Redirect)?;
        let start = match after {
            Some(cursor) => all
                .iter()
                .position(|t| t.id == cursor)
                .map(|i| i + 1)
                .unwrap_or(all.len()),
            None => 0,
        };
        let end = (start + page_size.max(1)).min(all.len());
        let threads = all[start..end].to_vec();
        let after = if end < all.len() {
            threads.last().map(|t| t.id.clone())
        } else {
            None
        };

        Ok(ThreadPage { threads, after })
    }

    async fn thread_comments(&self, thread_id: &str) -> Result<Vec<Comment>, SourceError> {
        if let Some(err) = pop_fault(&self.comment_faults, thread_id) {
            return Err(err);
        }
        Ok(self.comments.get(thread_id).cloned().unwrap_or_default())
    }

    async fn user_overview(&self, user: &str, limit: usize) -> Result<Vec<ActivityRecord>, SourceError> {
        bump(&self.overview_calls, user);
        if let Some(err) = pop_fault(&self.overview_faults, user) {
            return Err(err);
        }

        self.overviews
            .get(user)
            .map(|records| records.iter().take(limit).cloned().collect())
            .ok_or(SourceError::status(404))
    }
}
