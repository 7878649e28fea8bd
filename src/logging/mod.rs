// SPDX-License-Identifier: GPL-3.0-only
pub mod setup;
pub mod writer;

pub use setup::setup_logging;
pub use writer::ProgressAwareStderr;
