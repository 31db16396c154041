use std::fmt;
use std::str::FromStr;

/// Kind of item a participant authored
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ItemKind {
    Thread,
    Comment,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Thread => "thread",
            ItemKind::Comment => "comment",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thread" => Ok(ItemKind::Thread),
            "comment" => Ok(ItemKind::Comment),
            other => Err(format!("unknown item kind: {other}")),
        }
    }
}

/// One item from a participant's activity overview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub community: String,
    pub kind: ItemKind,
    pub item_id: String,
    pub score: i64,
}

impl ActivityRecord {
    pub fn new(community: impl Into<String>, kind: ItemKind, item_id: impl Into<String>, score: i64) -> Self {
        Self {
            community: community.into(),
            kind,
            item_id: item_id.into(),
            score,
        }
    }
}
