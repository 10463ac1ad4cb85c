use crate::domain::cache::{CacheEntry, CacheKey};
use crate::domain::ports::CurrentUser;
use crate::error::Result;
use crate::infrastructure::scripted::CannedResponse;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};

/// One line of a replay scenario.
///
/// Remote-backed steps carry the response the scripted transport will give.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Step {
    Seed {
        key: CacheKey,
        value: CacheEntry,
    },
    SignIn {
        user: CurrentUser,
    },
    SignOut,
    AddComment {
        container_id: String,
        body: String,
        #[serde(default)]
        parent_id: Option<String>,
        response: CannedResponse,
    },
    DeleteComment {
        container_id: String,
        comment_id: String,
        response: CannedResponse,
    },
    ToggleReaction {
        target_id: String,
        kind: String,
        response: CannedResponse,
    },
    ToggleLike {
        target_id: String,
        response: CannedResponse,
    },
}

/// Reads scenario steps from a JSON-lines source.
///
/// Blank lines and lines starting with `#` are skipped. A malformed line
/// yields an error for that line only; reading continues with the next one.
pub struct ScenarioReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> ScenarioReader<R> {
    /// Creates a new `ScenarioReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Returns an iterator that lazily reads and deserializes steps.
    pub fn steps(self) -> impl Iterator<Item = Result<Step>> {
        self.reader
            .lines()
            .filter(|line| match line {
                Ok(line) => {
                    let line = line.trim();
                    !line.is_empty() && !line.starts_with('#')
                }
                Err(_) => true,
            })
            .map(|line| -> Result<Step> {
                let line = line?;
                Ok(serde_json::from_str(&line)?)
            })
    }
}
