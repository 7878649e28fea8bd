// SPDX-License-Identifier: GPL-3.0-only
use futures_util::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::organizer::FsOrganizer;
use crate::scheduler::progress::ProgressSink;
use crate::scheduler::task::{DownloadError, DownloadOutcome, DownloadTask, OutcomeStatus};
use crate::transport::{Transport, TransportError};

/// Runs download tasks with a fixed number of concurrent transfers.
///
/// Every task ends in exactly one [`DownloadOutcome`]; a failing task never
/// affects its siblings.
pub struct DownloadScheduler {
    transport: Arc<dyn Transport>,
    progress: Arc<dyn ProgressSink>,
    max_concurrent: usize,
}

impl DownloadScheduler {
    pub fn new(
        transport: Arc<dyn Transport>,
        progress: Arc<dyn ProgressSink>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            transport,
            progress,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Process all tasks. Outcomes come back in completion order.
    pub async fn run(&self, tasks: Vec<DownloadTask>) -> Vec<DownloadOutcome> {
        let total = tasks.len();
        info!(total, max_concurrent = self.max_concurrent, "Starting downloads");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut pending: HashMap<usize, DownloadTask> = HashMap::with_capacity(total);
        let mut workers = JoinSet::new();

        for (index, task) in tasks.into_iter().enumerate() {
            pending.insert(task.id, task.clone());

            let semaphore = Arc::clone(&semaphore);
            let transport = Arc::clone(&self.transport);
            let progress = Arc::clone(&self.progress);
            let position = format!("{}/{}", index + 1, total);

            workers.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let err = DownloadError::Aborted(e.to_string());
                        return DownloadOutcome::failed(task, &err);
                    }
                };
                process_task(transport.as_ref(), progress.as_ref(), task, &position).await
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => {
                    pending.remove(&outcome.task.id);
                    outcomes.push(outcome);
                }
                Err(e) => error!(error = %e, "Download worker did not finish"),
            }
        }

        // Workers that panicked still owe an outcome
        for (_, task) in pending {
            let err = DownloadError::Aborted("worker panicked".to_string());
            remove_partials_for(&task.target_path).await;
            self.progress.finish(task.id, OutcomeStatus::Failed);
            outcomes.push(DownloadOutcome::failed(task, &err));
        }

        outcomes
    }
}

async fn process_task(
    transport: &dyn Transport,
    progress: &dyn ProgressSink,
    task: DownloadTask,
    position: &str,
) -> DownloadOutcome {
    if FsOrganizer::exists(&task.target_path).await {
        info!(
            position = %position,
            category = %task.category,
            filename = %task.resource.filename,
            "File already exists, skipping"
        );
        let outcome = DownloadOutcome::skipped(task);
        progress.finish(outcome.task.id, outcome.status);
        return outcome;
    }

    info!(
        position = %position,
        category = %task.category,
        filename = %task.resource.filename,
        url = %task.resource.source_url,
        "Downloading"
    );

    let outcome = match download_to_path(transport, progress, &task, position).await {
        Ok(bytes) => {
            info!(
                position = %position,
                path = %task.target_path.display(),
                bytes,
                "Download completed"
            );
            DownloadOutcome::completed(task, bytes)
        }
        Err(e) => {
            warn!(
                position = %position,
                category = %task.category,
                category_id = task.resource.category_id,
                filename = %task.resource.filename,
                url = %task.resource.source_url,
                error = %e,
                "Download failed"
            );
            DownloadOutcome::failed(task, &e)
        }
    };

    progress.finish(outcome.task.id, outcome.status);
    outcome
}

/// Stream into a hidden partial file, then rename into place.
///
/// The final path only ever holds a complete body; the partial file is
/// removed on every error path.
async fn download_to_path(
    transport: &dyn Transport,
    progress: &dyn ProgressSink,
    task: &DownloadTask,
    position: &str,
) -> Result<u64, DownloadError> {
    let partial = FsOrganizer::partial_path(&task.target_path);

    let result: Result<u64, DownloadError> = async {
        let received = stream_body(transport, progress, task, position, &partial).await?;
        tokio::fs::rename(&partial, &task.target_path)
            .await
            .map_err(|e| DownloadError::io(&task.target_path, e))?;
        Ok(received)
    }
    .await;

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&partial).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %partial.display(), error = %e, "Failed to remove partial download");
            }
        }
    }

    result
}

async fn stream_body(
    transport: &dyn Transport,
    progress: &dyn ProgressSink,
    task: &DownloadTask,
    position: &str,
    partial: &Path,
) -> Result<u64, DownloadError> {
    let cookies: Vec<(&str, &str)> = task
        .resource
        .document_id
        .as_deref()
        .map(|id| ("documentId", id))
        .into_iter()
        .collect();

    let mut body = transport.fetch_stream(&task.resource.source_url, &cookies).await?;
    let total = body.content_length;
    progress.begin(task, position, total);

    let mut file = tokio::fs::File::create(partial)
        .await
        .map_err(|e| DownloadError::io(partial, e))?;

    let mut received: u64 = 0;
    while let Some(chunk) = body.chunks.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(partial, e))?;
        received += chunk.len() as u64;
        progress.update(task.id, received, total);
    }

    file.flush().await.map_err(|e| DownloadError::io(partial, e))?;
    file.sync_all().await.map_err(|e| DownloadError::io(partial, e))?;

    if let Some(expected) = total {
        if received != expected {
            return Err(TransportError::Interrupted {
                url: task.resource.source_url.clone(),
                reason: format!("expected {} bytes, received {}", expected, received),
            }
            .into());
        }
    }

    Ok(received)
}

/// Clean up after a worker that died without reaching its own cleanup
async fn remove_partials_for(target: &Path) {
    let (Some(dir), Some(name)) = (target.parent(), target.file_name()) else {
        return;
    };
    let prefix = format!(".{}.", name.to_string_lossy());

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let entry_name = entry.file_name();
        let entry_name = entry_name.to_string_lossy();
        if entry_name.starts_with(&prefix) && entry_name.ends_with(".part") {
            let path = entry.path();
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove partial download");
                }
            }
        }
    }
}
