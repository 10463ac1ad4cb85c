use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-kind reaction counts plus the current user's own selection.
///
/// Counts never go negative: decrements saturate at zero, which is why a
/// failed toggle is undone from a snapshot instead of by toggling back.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReactionAggregate {
    pub counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub current_user_reaction: Option<String>,
}

/// Which branch of the toggle was taken.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ToggleKind {
    Added,
    Removed,
    Swapped,
}

impl ReactionAggregate {
    pub fn new<I, K>(counts: I, current_user_reaction: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<String>,
    {
        Self {
            counts: counts.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            current_user_reaction: current_user_reaction.map(str::to_string),
        }
    }

    pub fn count(&self, kind: &str) -> u32 {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    /// Next aggregate after the current user toggles `kind`.
    pub fn toggled(&self, kind: &str) -> (Self, ToggleKind) {
        let mut next = self.clone();
        let outcome = match self.current_user_reaction.as_deref() {
            Some(current) if current == kind => {
                next.decrement(kind);
                next.current_user_reaction = None;
                ToggleKind::Removed
            }
            Some(previous) => {
                next.decrement(previous);
                next.increment(kind);
                next.current_user_reaction = Some(kind.to_string());
                ToggleKind::Swapped
            }
            None => {
                next.increment(kind);
                next.current_user_reaction = Some(kind.to_string());
                ToggleKind::Added
            }
        };
        (next, outcome)
    }

    fn increment(&mut self, kind: &str) {
        let count = self.counts.entry(kind.to_string()).or_insert(0);
        *count = count.saturating_add(1);
    }

    fn decrement(&mut self, kind: &str) {
        let count = self.counts.entry(kind.to_string()).or_insert(0);
        *count = count.saturating_sub(1);
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct LikeAggregate {
    pub count: u32,
    pub has_current_user_liked: bool,
}

impl LikeAggregate {
    pub fn new(count: u32, has_current_user_liked: bool) -> Self {
        Self {
            count,
            has_current_user_liked,
        }
    }

    pub fn toggled(&self) -> Self {
        if self.has_current_user_liked {
            Self::new(self.count.saturating_sub(1), false)
        } else {
            Self::new(self.count.saturating_add(1), true)
        }
    }
}
