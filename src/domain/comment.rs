//! Nested reply-comment trees and the pure locator/mutator over them.
//!
//! Everything here works on borrowed slices and returns new values: the input
//! tree may be the very snapshot a mutation will restore on failure, so it is
//! never touched. When the target cannot be found the original slice is handed
//! back as `Cow::Borrowed`, letting callers detect the no-op without comparing
//! trees.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Prefix shared by every temporary comment id.
pub const OPTIMISTIC_ID_PREFIX: &str = "optimistic-";

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Replies in insertion order.
    #[serde(default, rename = "replies", alias = "children")]
    pub children: Vec<CommentNode>,
    /// True only for unconfirmed optimistic nodes.
    #[serde(default)]
    pub pending: bool,
}

impl CommentNode {
    /// Builds an unconfirmed node with a fresh temporary id.
    pub fn optimistic(
        parent_id: Option<String>,
        author_id: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: optimistic_id(now),
            parent_id,
            author_id: author_id.into(),
            body: body.into(),
            created_at: now,
            children: Vec::new(),
            pending: true,
        }
    }

    /// Copies this node's own fields, replacing its replies.
    fn with_children(&self, children: Vec<CommentNode>) -> Self {
        Self {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            author_id: self.author_id.clone(),
            body: self.body.clone(),
            created_at: self.created_at,
            children,
            pending: self.pending,
        }
    }
}

/// Generates `optimistic-<epoch-ms>-<base36>`.
pub fn optimistic_id(now: DateTime<Utc>) -> String {
    let suffix: u64 = rand::thread_rng().gen_range(36u64.pow(5)..36u64.pow(9));
    format!(
        "{OPTIMISTIC_ID_PREFIX}{}-{}",
        now.timestamp_millis().max(0),
        to_base36(suffix)
    )
}

/// Whether `id` was produced by [`optimistic_id`] and must not be treated as stable.
pub fn is_optimistic_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(OPTIMISTIC_ID_PREFIX) else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('-') else {
        return false;
    };
    !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && !suffix.is_empty()
        && suffix
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Result of a locate-and-transform pass.
#[derive(Debug)]
pub struct Located<'a> {
    pub tree: Cow<'a, [CommentNode]>,
    pub found: bool,
}

impl Located<'_> {
    pub fn into_tree(self) -> Vec<CommentNode> {
        self.tree.into_owned()
    }
}

/// Depth-first search for `target`, returning the child indices leading to it.
fn path_to(nodes: &[CommentNode], target: &str) -> Option<Vec<usize>> {
    for (idx, node) in nodes.iter().enumerate() {
        if node.id == target {
            return Some(vec![idx]);
        }
        if let Some(mut rest) = path_to(&node.children, target) {
            rest.insert(0, idx);
            return Some(rest);
        }
    }
    None
}

/// Rebuilds only the nodes along `path`, applying `transform` to the
/// `children` of the node at its end (or to `nodes` itself for an empty path).
fn rebuild_along<F>(nodes: &[CommentNode], path: &[usize], transform: F) -> Vec<CommentNode>
where
    F: FnOnce(&[CommentNode]) -> Vec<CommentNode>,
{
    match path.split_first() {
        None => transform(nodes),
        Some((&idx, rest)) => {
            let mut rebuilt = nodes.to_vec();
            let node = &nodes[idx];
            rebuilt[idx] = node.with_children(rebuild_along(&node.children, rest, transform));
            rebuilt
        }
    }
}

/// Applies `transform` to the replies of `target_id`, or to the root list when
/// `target_id` is `None`.
///
/// A target that is nowhere in the tree (a stale or removed parent) yields the
/// input slice unchanged with `found == false`.
pub fn locate_and_transform<'a, F>(
    tree: &'a [CommentNode],
    target_id: Option<&str>,
    transform: F,
) -> Located<'a>
where
    F: FnOnce(&[CommentNode]) -> Vec<CommentNode>,
{
    let path = match target_id {
        None => Vec::new(),
        Some(target) => match path_to(tree, target) {
            Some(path) => path,
            None => {
                return Located {
                    tree: Cow::Borrowed(tree),
                    found: false,
                };
            }
        },
    };
    // The transform targets the located node's replies, so the path runs
    // through it rather than stopping at its parent.
    let tree = rebuild_along(tree, &path, transform);
    Located {
        tree: Cow::Owned(tree),
        found: true,
    }
}

/// Removes the node `id` together with its replies.
pub fn remove_node<'a>(tree: &'a [CommentNode], id: &str) -> Located<'a> {
    let Some(path) = path_to(tree, id) else {
        return Located {
            tree: Cow::Borrowed(tree),
            found: false,
        };
    };
    let Some((&last, parent_path)) = path.split_last() else {
        return Located {
            tree: Cow::Borrowed(tree),
            found: false,
        };
    };
    let tree = rebuild_along(tree, parent_path, |siblings| {
        siblings
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != last)
            .map(|(_, node)| node.clone())
            .collect()
    });
    Located {
        tree: Cow::Owned(tree),
        found: true,
    }
}

/// Transform that puts `node` first, matching the newest-first ordering.
pub fn prepend(node: CommentNode) -> impl FnOnce(&[CommentNode]) -> Vec<CommentNode> {
    move |siblings| {
        let mut out = Vec::with_capacity(siblings.len() + 1);
        out.push(node);
        out.extend_from_slice(siblings);
        out
    }
}

/// Number of pending nodes anywhere in the tree.
pub fn count_pending(tree: &[CommentNode]) -> usize {
    tree.iter()
        .map(|node| usize::from(node.pending) + count_pending(&node.children))
        .sum()
}

pub fn find<'a>(tree: &'a [CommentNode], id: &str) -> Option<&'a CommentNode> {
    tree.iter().find_map(|node| {
        if node.id == id {
            Some(node)
        } else {
            find(&node.children, id)
        }
    })
}
