use super::comment::CommentNode;
use super::pledge::PledgeStatus;
use super::reaction::{LikeAggregate, ReactionAggregate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one cached query.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CacheKey {
    /// Comment tree of a container (post, article, campaign...).
    Comments(String),
    Reactions(String),
    Likes(String),
    PledgeStatus(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comments(id) => write!(f, "comments/{id}"),
            Self::Reactions(id) => write!(f, "reactions/{id}"),
            Self::Likes(id) => write!(f, "likes/{id}"),
            Self::PledgeStatus(id) => write!(f, "pledge-status/{id}"),
        }
    }
}

/// A cached value. Cloning deep-copies it, which is what snapshots rely on.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CacheEntry {
    Comments(Vec<CommentNode>),
    Reactions(ReactionAggregate),
    Likes(LikeAggregate),
    PledgeStatus(PledgeStatus),
}

impl CacheEntry {
    pub fn as_comments(&self) -> Option<&[CommentNode]> {
        match self {
            Self::Comments(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_reactions(&self) -> Option<&ReactionAggregate> {
        match self {
            Self::Reactions(agg) => Some(agg),
            _ => None,
        }
    }

    pub fn as_likes(&self) -> Option<&LikeAggregate> {
        match self {
            Self::Likes(agg) => Some(agg),
            _ => None,
        }
    }

    pub fn as_pledge_status(&self) -> Option<&PledgeStatus> {
        match self {
            Self::PledgeStatus(status) => Some(status),
            _ => None,
        }
    }
}

/// Prior value of a cache key, taken before an optimistic write.
#[derive(Debug, PartialEq, Clone)]
pub enum Snapshot {
    Present(CacheEntry),
    /// Nothing was cached; restoring means removing the key.
    Absent,
    /// Nothing was cached and the key was waiting for a refetch; restoring
    /// means invalidating it again.
    Stale,
}

impl From<Option<CacheEntry>> for Snapshot {
    fn from(value: Option<CacheEntry>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

impl Snapshot {
    pub fn entry(&self) -> Option<&CacheEntry> {
        match self {
            Self::Present(entry) => Some(entry),
            Self::Absent | Self::Stale => None,
        }
    }
}
