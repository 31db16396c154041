//! Client for the platform's public JSON listing endpoints
//!
//! Read-only and unauthenticated. Redirects are not followed: the platform
//! answers a request for a nonexistent community with a redirect to search.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{redirect, StatusCode};
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::debug;

use crate::model::{ActivityRecord, Comment, ItemKind, Thread, ThreadPage};

use super::{ContentSource, SourceError};

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

/// Listing endpoints cap page size at 100
const MAX_PAGE: usize = 100;

/// morechildren accepts at most 100 ids per call
const MORE_BATCH: usize = 100;

pub struct RedditClient {
    http: reqwest::Client,
    base_url: String,
}

impl RedditClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, user_agent, timeout)
    }

    pub fn with_base_url(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let resp = self.http.get(&url).query(query).send().await?;
        let status = resp.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(SourceError::RateLimited { retry_after });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::Unauthorized);
        }
        if status.is_redirection() {
            return Err(SourceError::Redirect);
        }
        if !status.is_success() {
            return Err(SourceError::status(status.as_u16()));
        }

        Ok(resp.json::<Value>().await?)
    }

    async fn more_children(&self, thread_id: &str, ids: &[String]) -> Result<Vec<Value>, SourceError> {
        let query = [
            ("api_type", "json".to_string()),
            ("raw_json", "1".to_string()),
            ("link_id", format!("t3_{thread_id}")),
            ("children", ids.join(",")),
        ];
        let body = self.get_json("/api/morechildren.json", &query).await?;
        Ok(body["json"]["data"]["things"]
            .as_array()
            .cloned()
            .unwrap_or_default())
    }
}

/// Author name, with the platform's deleted placeholder mapped to None
fn author_of(data: &Value) -> Option<String> {
    match data["author"].as_str() {
        Some("[deleted]") | Some("") | None => None,
        Some(name) => Some(name.to_string()),
    }
}

fn children_of(listing: &Value) -> Result<&Vec<Value>, SourceError> {
    listing["data"]["children"]
        .as_array()
        .ok_or_else(|| SourceError::Decode("listing without children".into()))
}

fn str_field(data: &Value, key: &str) -> Result<String, SourceError> {
    data[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SourceError::Decode(format!("missing field {key}")))
}

/// Parse a comment listing into a tree, collecting ids of collapsed stubs
fn parse_comments(listing: &Value, more: &mut Vec<String>) -> Vec<Comment> {
    let Some(children) = listing["data"]["children"].as_array() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for child in children {
        let data = &child["data"];
        match child["kind"].as_str() {
            Some("t1") => {
                let Some(id) = data["id"].as_str() else { continue };
                // "replies" is an empty string when there are none
                let replies = parse_comments(&data["replies"], more);
                out.push(Comment {
                    id: id.to_string(),
                    author: author_of(data),
                    score: data["score"].as_i64().unwrap_or(0),
                    replies,
                });
            }
            Some("more") => {
                if let Some(ids) = data["children"].as_array() {
                    more.extend(ids.iter().filter_map(|v| v.as_str().map(str::to_string)));
                }
            }
            _ => {}
        }
    }
    out
}

impl ContentSource for RedditClient {
    async fn hot_threads(
        &self,
        community: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<ThreadPage, SourceError> {
        let mut query = vec![
            ("limit", page_size.clamp(1, MAX_PAGE).to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(cursor) = after {
            query.push(("after", cursor.to_string()));
        }

        let body = self.get_json(&format!("/r/{community}/hot.json"), &query).await?;
        let mut threads = Vec::new();
        for child in children_of(&body)? {
            if child["kind"].as_str() != Some("t3") {
                continue;
            }
            let data = &child["data"];
            threads.push(Thread {
                id: str_field(data, "id")?,
                author: author_of(data),
                score: data["score"].as_i64().unwrap_or(0),
            });
        }

        Ok(ThreadPage {
            threads,
            after: body["data"]["after"].as_str().map(str::to_string),
        })
    }

    async fn thread_comments(&self, thread_id: &str) -> Result<Vec<Comment>, SourceError> {
        let query = [("limit", "500".to_string()), ("raw_json", "1".to_string())];
        let body = self.get_json(&format!("/comments/{thread_id}.json"), &query).await?;

        let mut pending = Vec::new();
        let mut comments = parse_comments(&body[1], &mut pending);
        let mut requested: FxHashSet<String> = FxHashSet::default();

        while !pending.is_empty() {
            let batch: Vec<String> = pending
                .drain(..pending.len().min(MORE_BATCH))
                .filter(|id| requested.insert(id.clone()))
                .collect();
            if batch.is_empty() {
                continue;
            }

            // Expanded comments come back flat; they are appended at top level
            let things = self.more_children(thread_id, &batch).await?;
            let wrapped = serde_json::json!({ "data": { "children": things } });
            comments.extend(parse_comments(&wrapped, &mut pending));
        }

        Ok(comments)
    }

    async fn user_overview(&self, user: &str, limit: usize) -> Result<Vec<ActivityRecord>, SourceError> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;

        while records.len() < limit {
            let mut query = vec![
                ("limit", (limit - records.len()).clamp(1, MAX_PAGE).to_string()),
                ("raw_json", "1".to_string()),
            ];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }

            let body = self.get_json(&format!("/user/{user}/overview.json"), &query).await?;
            for child in children_of(&body)? {
                let kind = match child["kind"].as_str() {
                    Some("t1") => ItemKind::Comment,
                    Some("t3") => ItemKind::Thread,
                    _ => continue,
                };
                let data = &child["data"];
                let (Some(community), Some(id)) = (data["subreddit"].as_str(), data["id"].as_str()) else {
                    continue;
                };
                records.push(ActivityRecord::new(
                    community,
                    kind,
                    id,
                    data["score"].as_i64().unwrap_or(0),
                ));
            }

            after = body["data"]["after"].as_str().map(str::to_string);
            if after.is_none() {
                break;
            }
        }

        records.truncate(limit);
        Ok(records)
    }
}
