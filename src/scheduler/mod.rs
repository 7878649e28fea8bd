// SPDX-License-Identifier: GPL-3.0-only
pub mod task;
pub mod progress;
pub mod download;

pub use task::{DownloadError, DownloadOutcome, DownloadTask, OutcomeStatus};
pub use progress::{ProgressSink, TerminalProgress, TracingProgress};
pub use download::DownloadScheduler;
