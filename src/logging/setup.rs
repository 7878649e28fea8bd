// SPDX-License-Identifier: GPL-3.0-only
use indicatif::MultiProgress;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::logging::ProgressAwareStderr;

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence over `log_level`.
///
/// Log lines go to stderr so the run summary on stdout stays clean. When
/// progress bars are shown, lines are printed above them instead of
/// through them.
pub fn setup_logging(log_level: &str, progress: Option<MultiProgress>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = match progress {
        Some(multi) => BoxMakeWriter::new(ProgressAwareStderr::new(multi)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(true)
                .with_target(false)
        )
        .try_init()?;

    Ok(())
}
