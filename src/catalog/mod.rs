// SPDX-License-Identifier: GPL-3.0-only
pub mod models;
pub mod parse;
pub mod remote;

pub use models::{CatalogError, Category, Resource, ResourceParseError};
pub use remote::RemoteCatalog;
