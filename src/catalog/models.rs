// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};

use crate::transport::TransportError;

/// A technology grouping published by the service (an OS, a browser, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Identifier used in the `latest benchmarks` endpoint
    pub id: u64,

    /// Human-readable name, used for the category's folder
    pub display_name: String,

    /// Top-level group the listing nested this category under, if any
    pub group: Option<String>,
}

/// One downloadable benchmark document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub category_id: u64,

    /// Published filename, not yet sanitized
    pub filename: String,

    /// Absolute download URL
    pub source_url: String,

    /// Remote document identifier, sent as the `documentId` cookie
    pub document_id: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Failed to fetch technology list: {0}")]
    Transport(#[from] TransportError),

    #[error("Unexpected technology list shape: {0}")]
    Shape(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ResourceParseError {
    #[error("Failed to fetch latest benchmarks: {0}")]
    Transport(#[from] TransportError),

    #[error("Unexpected latest-benchmarks shape for category {category_id}: {reason}")]
    Shape { category_id: u64, reason: String },
}
