/// A thread from a community listing
#[derive(Debug, Clone)]
pub struct Thread {
    pub id: String,
    /// None when the author was deleted or removed
    pub author: Option<String>,
    pub score: i64,
}

/// A comment and its nested replies
#[derive(Debug, Clone, Default)]
pub struct Comment {
    pub id: String,
    pub author: Option<String>,
    pub score: i64,
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(id: &str, author: Option<&str>, score: i64) -> Self {
        Self {
            id: id.to_string(),
            author: author.map(str::to_string),
            score,
            replies: Vec::new(),
        }
    }

    pub fn with_replies(mut self, replies: Vec<Comment>) -> Self {
        self.replies = replies;
        self
    }
}

/// Flatten a comment forest depth-first, parents before their replies
pub fn flatten_comments(comments: &[Comment]) -> Vec<&Comment> {
    let mut out = Vec::new();
    let mut stack: Vec<&Comment> = comments.iter().rev().collect();
    while let Some(comment) = stack.pop() {
        out.push(comment);
        stack.extend(comment.replies.iter().rev());
    }
    out
}

/// One page of a community's hot listing
#[derive(Debug, Clone, Default)]
pub struct ThreadPage {
    pub threads: Vec<Thread>,
    /// Cursor for the next page, None on the last page
    pub after: Option<String>,
}
