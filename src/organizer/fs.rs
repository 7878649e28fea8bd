// SPDX-License-Identifier: GPL-3.0-only
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::Category;
use crate::utils::{sanitize_dir_name, sanitize_filename};

/// Suffix of in-progress downloads
const PARTIAL_SUFFIX: &str = ".part";

/// Lays out the category tree under one root directory
#[derive(Debug, Clone)]
pub struct FsOrganizer {
    root: PathBuf,
}

impl FsOrganizer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a category's documents belong in. Pure; touches nothing on disk.
    ///
    /// A name that sanitizes to nothing falls back to `category-<id>`.
    pub fn category_dir(&self, category: &Category) -> PathBuf {
        let mut dir = self.root.clone();
        if let Some(group) = category.group.as_deref().and_then(sanitize_dir_name) {
            dir.push(group);
        }
        let name = sanitize_dir_name(&category.display_name)
            .unwrap_or_else(|| format!("category-{}", category.id));
        dir.push(name);
        dir
    }

    /// Create the category directory (and parents) if absent.
    ///
    /// Leftover partial downloads from an aborted earlier run are removed.
    pub async fn ensure_directory(&self, category: &Category) -> std::io::Result<PathBuf> {
        let dir = self.category_dir(category);
        tokio::fs::create_dir_all(&dir).await?;
        remove_stale_partials(&dir).await;
        Ok(dir)
    }

    /// Final location of `filename` inside `dir`, or `None` if the name is unusable
    pub fn target_path(dir: &Path, filename: &str) -> Option<PathBuf> {
        sanitize_filename(filename).map(|name| dir.join(name))
    }

    /// Whether a complete document is already in place.
    ///
    /// Zero-byte files count as absent.
    pub async fn exists(path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    /// Hidden sibling a download is streamed into before being renamed into place
    pub fn partial_path(target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!(
            ".{}.{}{}",
            name,
            Uuid::new_v4().simple(),
            PARTIAL_SUFFIX
        ))
    }
}

/// Matches names produced by [`FsOrganizer::partial_path`]
fn is_partial_name(name: &str) -> bool {
    let Some(inner) = name
        .strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(PARTIAL_SUFFIX))
    else {
        return false;
    };

    match inner.rsplit_once('.') {
        Some((original, token)) => {
            !original.is_empty() && token.len() == 32 && token.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

async fn remove_stale_partials(dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Could not scan directory for partial downloads");
            return;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if !is_partial_name(&name.to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed stale partial download"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale partial download"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn category(id: u64, name: &str, group: Option<&str>) -> Category {
        Category {
            id,
            display_name: name.to_string(),
            group: group.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_ensure_directory_creates_sanitized_dir() {
        let temp_dir = TempDir::new().unwrap();
        let organizer = FsOrganizer::new(temp_dir.path().to_path_buf());

        let dir = organizer
            .ensure_directory(&category(7618, "CIS macOS Safari Benchmark", None))
            .await
            .unwrap();

        assert_eq!(dir, temp_dir.path().join("CIS macOS Safari Benchmark"));
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_directory_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let organizer = FsOrganizer::new(temp_dir.path().to_path_buf());
        let cat = category(1, "Debian/Linux", Some("Operating Systems"));

        let first = organizer.ensure_directory(&cat).await.unwrap();
        std::fs::write(first.join("keep.pdf"), b"data").unwrap();
        let second = organizer.ensure_directory(&cat).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, temp_dir.path().join("Operating Systems").join("Debian_Linux"));
        assert!(second.join("keep.pdf").exists());
    }

    #[test]
    fn test_category_dir_fallback_name() {
        let organizer = FsOrganizer::new(PathBuf::from("/out"));
        assert_eq!(
            organizer.category_dir(&category(42, "..", None)),
            PathBuf::from("/out/category-42")
        );
    }

    #[test]
    fn test_target_path_strips_directories() {
        let dir = Path::new("/out/Safari");
        assert_eq!(
            FsOrganizer::target_path(dir, "../../escape.pdf"),
            Some(PathBuf::from("/out/Safari/escape.pdf"))
        );
        assert_eq!(FsOrganizer::target_path(dir, "/"), None);
    }

    #[tokio::test]
    async fn test_exists_requires_non_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let full = temp_dir.path().join("full.pdf");
        let empty = temp_dir.path().join("empty.pdf");
        std::fs::write(&full, b"%PDF").unwrap();
        std::fs::write(&empty, b"").unwrap();

        assert!(FsOrganizer::exists(&full).await);
        assert!(!FsOrganizer::exists(&empty).await);
        assert!(!FsOrganizer::exists(&temp_dir.path().join("missing.pdf")).await);
        assert!(!FsOrganizer::exists(temp_dir.path()).await);
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        let target = Path::new("/out/Safari/benchmark.pdf");
        let partial = FsOrganizer::partial_path(target);

        assert_eq!(partial.parent(), target.parent());
        let name = partial.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".benchmark.pdf."));
        assert!(is_partial_name(name));
        assert_ne!(partial, FsOrganizer::partial_path(target));
    }

    #[test]
    fn test_partial_path_of_longest_name_fits_component_limit() {
        let filename = format!("{}.pdf", "A".repeat(240));
        let target = FsOrganizer::target_path(Path::new("/out/Safari"), &filename).unwrap();
        let partial = FsOrganizer::partial_path(&target);

        let name = partial.file_name().unwrap().to_str().unwrap();
        assert!(target.to_str().unwrap().ends_with(".pdf"));
        assert_eq!(name.len(), 255);
        assert!(is_partial_name(name));
    }

    #[test]
    fn test_is_partial_name() {
        assert!(!is_partial_name("benchmark.pdf"));
        assert!(!is_partial_name(".hidden.part"));
        assert!(!is_partial_name(".notes.txt.part"));
    }

    #[tokio::test]
    async fn test_ensure_directory_removes_stale_partials() {
        let temp_dir = TempDir::new().unwrap();
        let organizer = FsOrganizer::new(temp_dir.path().to_path_buf());
        let cat = category(3, "Kubernetes", None);
        let dir = organizer.category_dir(&cat);
        std::fs::create_dir_all(&dir).unwrap();

        let stale = FsOrganizer::partial_path(&dir.join("k8s.pdf"));
        std::fs::write(&stale, b"half").unwrap();
        std::fs::write(dir.join("k8s.pdf"), b"whole").unwrap();

        organizer.ensure_directory(&cat).await.unwrap();

        assert!(!stale.exists());
        assert!(dir.join("k8s.pdf").exists());
    }
}
