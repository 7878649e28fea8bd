// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::catalog::models::{CatalogError, Category, Resource, ResourceParseError};
use crate::catalog::parse::{parse_categories, parse_latest_resources};
use crate::transport::Transport;

/// Resolves categories and their latest documents from the remote API
pub struct RemoteCatalog {
    transport: Arc<dyn Transport>,
    base_url: String,
    resource_base: Url,
}

impl RemoteCatalog {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        resource_base_url: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            resource_base: Url::parse(resource_base_url)?,
        })
    }

    fn technology_url(&self) -> String {
        format!("{}/technology", self.base_url)
    }

    fn latest_url(&self, category_id: u64) -> String {
        format!("{}/technology/{}/benchmarks/latest", self.base_url, category_id)
    }

    /// Fetch the technology listing
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let value = self.transport.fetch_json(&self.technology_url()).await?;
        let categories = parse_categories(value)?;

        info!(count = categories.len(), "Resolved technology categories");
        Ok(categories)
    }

    /// Fetch the documents currently published as latest for one category
    pub async fn list_latest_resources(
        &self,
        category: &Category,
    ) -> Result<Vec<Resource>, ResourceParseError> {
        let value = self.transport.fetch_json(&self.latest_url(category.id)).await?;
        parse_latest_resources(category, value, &self.resource_base)
    }
}
