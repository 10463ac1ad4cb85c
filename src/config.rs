use crate::domain::pledge::PollSchedule;
use crate::error::Result;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Runtime settings, loadable from a JSON file. Missing fields keep their defaults.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub poll: PollSchedule,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll: PollSchedule::default(),
            log_filter: "optimistic_cache=info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.poll.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_path)
    }
}
