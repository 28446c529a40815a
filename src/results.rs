//! JSON log of sweep results.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::LocateResult;

/// Alphas recorded for one configuration, in facility-count order.
///
/// `None` marks a facility count whose search failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry<K> {
    pub key: K,
    pub alphas: Vec<Option<f64>>,
}

/// Collects `(configuration, alphas)` entries and writes them as a JSON list
/// of `[key, alphas]` pairs. Saving overwrites any existing file.
#[derive(Debug, Clone)]
pub struct AlphaLog<K> {
    path: PathBuf,
    entries: Vec<LogEntry<K>>,
}

impl<K: Serialize> AlphaLog<K> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, key: K, alphas: Vec<Option<f64>>) {
        self.entries.push(LogEntry { key, alphas });
    }

    pub fn entries(&self) -> &[LogEntry<K>] {
        &self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn to_json(&self) -> LocateResult<String> {
        let pairs: Vec<(&K, &Vec<Option<f64>>)> =
            self.entries.iter().map(|e| (&e.key, &e.alphas)).collect();
        Ok(serde_json::to_string(&pairs)?)
    }

    pub fn save(&self) -> LocateResult<()> {
        fs::write(&self.path, self.to_json()?)?;
        log::info!("wrote {} log entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}
