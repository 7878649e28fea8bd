// SPDX-License-Identifier: GPL-3.0-only
pub mod fs;

pub use fs::FsOrganizer;
