// SPDX-License-Identifier: GPL-3.0-only
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, Category, RemoteCatalog, Resource};
use crate::organizer::FsOrganizer;
use crate::scheduler::{DownloadError, DownloadOutcome, DownloadScheduler, DownloadTask, OutcomeStatus};

/// Number of `latest benchmarks` lookups in flight at once
const RESOLVE_CONCURRENCY: usize = 4;

/// Counts per outcome for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub categories: usize,
    pub skipped: usize,
    pub completed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(categories: usize, outcomes: &[DownloadOutcome]) -> Self {
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();
        Self {
            categories,
            skipped: count(OutcomeStatus::Skipped),
            completed: count(OutcomeStatus::Completed),
            failed: count(OutcomeStatus::Failed),
        }
    }

    pub fn documents(&self) -> usize {
        self.skipped + self.completed + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, {} {}: {} completed, {} skipped, {} failed",
            self.categories,
            plural(self.categories, "category", "categories"),
            self.documents(),
            plural(self.documents(), "document", "documents"),
            self.completed,
            self.skipped,
            self.failed
        )
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub outcomes: Vec<DownloadOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| o.status == OutcomeStatus::Failed)
    }
}

/// Sequences category discovery, resource resolution and downloading
pub struct Pipeline {
    catalog: RemoteCatalog,
    organizer: FsOrganizer,
    scheduler: DownloadScheduler,
}

impl Pipeline {
    pub fn new(catalog: RemoteCatalog, organizer: FsOrganizer, scheduler: DownloadScheduler) -> Self {
        Self {
            catalog,
            organizer,
            scheduler,
        }
    }

    /// Run once. Only a failed category listing is an error; everything
    /// after that is recorded per document.
    pub async fn run(&self) -> Result<RunReport, CatalogError> {
        let categories = self.catalog.list_categories().await?;
        info!(
            categories = categories.len(),
            root = %self.organizer.root().display(),
            "Resolving latest benchmarks"
        );

        let resolved = self.resolve_resources(&categories).await;
        let (tasks, mut outcomes) = self.plan_tasks(resolved).await;

        outcomes.extend(self.scheduler.run(tasks).await);

        let summary = RunSummary::from_outcomes(categories.len(), &outcomes);
        info!(
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            bytes = outcomes.iter().map(|o| o.bytes).sum::<u64>(),
            "Run finished"
        );

        Ok(RunReport { summary, outcomes })
    }

    /// Look up every category's latest documents. Lookup failures yield an empty list.
    async fn resolve_resources<'a>(&self, categories: &'a [Category]) -> Vec<(&'a Category, Vec<Resource>)> {
        stream::iter(categories)
            .map(|category| async move {
                let resources = match self.catalog.list_latest_resources(category).await {
                    Ok(resources) => resources,
                    Err(e) => {
                        warn!(
                            category = %category.display_name,
                            category_id = category.id,
                            error = %e,
                            "Skipping category"
                        );
                        Vec::new()
                    }
                };
                (category, resources)
            })
            .buffered(RESOLVE_CONCURRENCY)
            .collect()
            .await
    }

    /// Turn resolved resources into download tasks.
    ///
    /// Categories without resources get no directory. Resources whose
    /// directory cannot be created come back as failed outcomes.
    async fn plan_tasks(
        &self,
        resolved: Vec<(&Category, Vec<Resource>)>,
    ) -> (Vec<DownloadTask>, Vec<DownloadOutcome>) {
        let mut tasks = Vec::new();
        let mut failures = Vec::new();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut next_id = 0;

        for (category, resources) in resolved {
            if resources.is_empty() {
                debug!(category = %category.display_name, "No published benchmarks");
                continue;
            }

            let dir_result = self.organizer.ensure_directory(category).await;
            let dir = match &dir_result {
                Ok(dir) => dir.clone(),
                Err(e) => {
                    warn!(category = %category.display_name, error = %e, "Failed to create category directory");
                    self.organizer.category_dir(category)
                }
            };

            for resource in resources {
                let Some(target_path) = FsOrganizer::target_path(&dir, &resource.filename) else {
                    warn!(
                        category = %category.display_name,
                        filename = %resource.filename,
                        "Dropping resource with unusable filename"
                    );
                    continue;
                };

                if !claimed.insert(target_path.clone()) {
                    warn!(
                        category = %category.display_name,
                        filename = %resource.filename,
                        "Dropping duplicate resource for the same file"
                    );
                    continue;
                }

                let task = DownloadTask {
                    id: next_id,
                    category: category.display_name.clone(),
                    resource,
                    target_path,
                };
                next_id += 1;

                match &dir_result {
                    Ok(_) => tasks.push(task),
                    Err(e) => {
                        let err = DownloadError::io(&dir, std::io::Error::new(e.kind(), e.to_string()));
                        failures.push(DownloadOutcome::failed(task, &err));
                    }
                }
            }
        }

        info!(tasks = tasks.len(), "Planned downloads");
        (tasks, failures)
    }
}
