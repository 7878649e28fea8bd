// SPDX-License-Identifier: GPL-3.0-only
mod catalog;
mod config;
mod logging;
mod organizer;
mod pipeline;
mod scheduler;
mod transport;
mod utils;

#[cfg(test)]
mod test_helpers;

use anyhow::Context;
use indicatif::MultiProgress;
use std::sync::Arc;
use tracing::{info, warn};

use catalog::RemoteCatalog;
use config::Config;
use logging::setup_logging;
use organizer::FsOrganizer;
use pipeline::Pipeline;
use scheduler::{DownloadScheduler, ProgressSink, TerminalProgress, TracingProgress};
use transport::{HttpTransport, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Progress bars and log lines share one terminal
    let bars = config.show_progress.then(MultiProgress::new);

    // Initialize logging
    setup_logging(&config.log_level, bars.clone())?;

    info!("Starting benchfetch v{}", env!("CARGO_PKG_VERSION"));
    info!(
        base_url = %config.base_url,
        output_dir = %config.output_dir.display(),
        max_concurrent_downloads = config.max_concurrent_downloads,
        "Configuration loaded"
    );

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
    let progress: Arc<dyn ProgressSink> = match bars {
        Some(multi) => Arc::new(TerminalProgress::with_multi(multi)),
        None => Arc::new(TracingProgress),
    };

    let catalog = RemoteCatalog::new(Arc::clone(&transport), &config.base_url, &config.resource_base_url)?;
    let organizer = FsOrganizer::new(config.output_dir.clone());
    let scheduler = DownloadScheduler::new(transport, progress, config.max_concurrent_downloads);

    let report = Pipeline::new(catalog, organizer, scheduler)
        .run()
        .await
        .context("Failed to list benchmark categories")?;

    for failure in report.failures() {
        warn!(
            category = %failure.task.category,
            filename = %failure.task.resource.filename,
            url = %failure.task.resource.source_url,
            error = failure.error.as_deref().unwrap_or("unknown error"),
            "Not downloaded"
        );
    }

    println!("{}", report.summary);
    Ok(())
}
