// SPDX-License-Identifier: GPL-3.0-only
use std::fmt;
use std::path::PathBuf;

use crate::catalog::Resource;
use crate::transport::TransportError;

/// One resource paired with the path it will be written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Position in the run, unique per task
    pub id: usize,

    /// Display name of the owning category, for log context
    pub category: String,

    pub resource: Resource,

    pub target_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    Skipped,
    Completed,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Completed => "completed",
            OutcomeStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download task aborted: {0}")]
    Aborted(String),
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Terminal record for one task
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub task: DownloadTask,
    pub status: OutcomeStatus,
    pub error: Option<String>,

    /// Bytes written by this run (zero for skipped and failed tasks)
    pub bytes: u64,
}

impl DownloadOutcome {
    pub fn skipped(task: DownloadTask) -> Self {
        Self {
            task,
            status: OutcomeStatus::Skipped,
            error: None,
            bytes: 0,
        }
    }

    pub fn completed(task: DownloadTask, bytes: u64) -> Self {
        Self {
            task,
            status: OutcomeStatus::Completed,
            error: None,
            bytes,
        }
    }

    pub fn failed(task: DownloadTask, error: &DownloadError) -> Self {
        Self {
            task,
            status: OutcomeStatus::Failed,
            error: Some(error.to_string()),
            bytes: 0,
        }
    }
}
