// SPDX-License-Identifier: GPL-3.0-only
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

use crate::scheduler::task::{DownloadTask, OutcomeStatus};

/// Receives per-task progress from concurrently running downloads.
///
/// Calls for different tasks may arrive from different threads in any order;
/// calls for one task arrive in order.
pub trait ProgressSink: Send + Sync {
    /// A transfer started. `total` is the advertised length, if any.
    fn begin(&self, task: &DownloadTask, position: &str, total: Option<u64>);

    /// `bytes_done` bytes of the task's body have been written
    fn update(&self, task_id: usize, bytes_done: u64, total: Option<u64>);

    /// The task reached its terminal state
    fn finish(&self, task_id: usize, status: OutcomeStatus);
}

/// Reports progress as log events; used when bars are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn begin(&self, task: &DownloadTask, position: &str, total: Option<u64>) {
        debug!(
            task_id = task.id,
            position = %position,
            filename = %task.resource.filename,
            total = ?total,
            "Transfer started"
        );
    }

    fn update(&self, task_id: usize, bytes_done: u64, total: Option<u64>) {
        trace!(task_id, bytes_done, total = ?total, "Transfer progress");
    }

    fn finish(&self, task_id: usize, status: OutcomeStatus) {
        debug!(task_id, status = %status, "Transfer finished");
    }
}

/// One terminal progress bar per active transfer.
///
/// Falls back to a spinner with a byte counter when the server sends no length.
pub struct TerminalProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
    bar_style: ProgressStyle,
    spinner_style: ProgressStyle,
}

impl TerminalProgress {
    /// Draw bars through `multi`; log output shares it to avoid tearing
    pub fn with_multi(multi: MultiProgress) -> Self {
        let bar_style = ProgressStyle::with_template(
            "{prefix} {wide_msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        let spinner_style = ProgressStyle::with_template("{prefix} {spinner} {wide_msg} {bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
            bar_style,
            spinner_style,
        }
    }

    fn take_bar(&self, task_id: usize) -> Option<ProgressBar> {
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_id)
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()))
    }

    #[cfg(test)]
    fn active_bars(&self) -> usize {
        self.bars.lock().unwrap().len()
    }
}

impl ProgressSink for TerminalProgress {
    fn begin(&self, task: &DownloadTask, position: &str, total: Option<u64>) {
        let bar = match total {
            Some(len) => self.multi.add(ProgressBar::new(len)).with_style(self.bar_style.clone()),
            None => {
                let spinner = self.multi.add(ProgressBar::new_spinner()).with_style(self.spinner_style.clone());
                spinner.enable_steady_tick(Duration::from_millis(120));
                spinner
            }
        };
        bar.set_prefix(position.to_string());
        bar.set_message(task.resource.filename.clone());

        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task.id, bar);
    }

    fn update(&self, task_id: usize, bytes_done: u64, total: Option<u64>) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = bars.get(&task_id) {
            if let Some(len) = total {
                bar.set_length(len);
            }
            bar.set_position(bytes_done);
        }
    }

    fn finish(&self, task_id: usize, status: OutcomeStatus) {
        if let Some(bar) = self.take_bar(task_id) {
            match status {
                OutcomeStatus::Completed => bar.finish_and_clear(),
                _ => bar.abandon_with_message(format!("{} ({})", bar.message(), status)),
            }
            self.multi.remove(&bar);
        }
    }
}
