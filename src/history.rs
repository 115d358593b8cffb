//! Watch history log
//!
//! Append-only text file, one `title||manifest||descriptor` record per line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::HistoryRecord;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Persistent record of watched selections
pub trait HistoryStore: Send + Sync {
    /// Record one selection. No-op when recording is disabled.
    fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError>;

    /// Every readable record, oldest first. Malformed lines are skipped.
    fn load_all(&self) -> Result<Vec<HistoryRecord>, HistoryError>;
}

/// File-backed history
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
    record: bool,
}

impl HistoryLog {
    /// Open the log at `path`, creating it (and its directory) if absent
    pub fn open(path: impl Into<PathBuf>, record: bool) -> Result<Self, HistoryError> {
        let path = path.into();
        let io_err = |source| HistoryError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        Ok(Self { path, record })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl HistoryStore for HistoryLog {
    fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        if !self.record {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        writeln!(file, "{}", record.to_line()).map_err(|e| self.io_err(e))?;
        tracing::debug!(title = %record.title, "history recorded");
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };

        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let record = HistoryRecord::parse_line(line);
                if record.is_none() {
                    tracing::warn!(%line, "skipping malformed history line");
                }
                record
            })
            .collect())
    }
}
