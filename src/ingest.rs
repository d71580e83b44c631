//! Loading documents from disk for the one-shot commands.
//!
//! Files named explicitly are always attempted; directories are walked
//! recursively and filtered to the supported extensions. Each loaded file
//! goes through the same extract → store path as an interactive upload,
//! so duplicate names and unsupported formats are skipped the same way.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::extract::{extract, SUPPORTED_EXTENSIONS};
use crate::models::Upload;
use crate::store::{document_id, DocumentStore};

const DEFAULT_EXCLUDES: [&str; 3] = ["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Documents loaded from disk plus the files that could not be.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub store: DocumentStore,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Read a file into an [`Upload`] named after its final path component.
pub fn read_upload(path: &Path) -> Result<Upload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Upload::new(name, bytes))
}

/// Expand `paths` into a sorted file list. Directories contribute only
/// files with a supported extension that are not excluded.
pub fn collect_files(paths: &[PathBuf], exclude_globs: &[String]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(
        SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| format!("**/*.{}", ext)),
    )?;
    let exclude_set = build_globset(
        DEFAULT_EXCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(exclude_globs.iter().cloned()),
    )?;

    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("Path does not exist: {}", path.display());
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(path) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            let rel_str = relative.to_string_lossy().to_string();
            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }
            found.push(entry.path().to_path_buf());
        }
        found.sort();
        debug!(dir = %path.display(), files = found.len(), "scanned directory");
        files.extend(found);
    }
    Ok(files)
}

/// Extract every file into a fresh store. Per-file failures are recorded in
/// [`LoadReport::skipped`] rather than aborting the load.
pub fn load_documents(paths: &[PathBuf], exclude_globs: &[String]) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for path in collect_files(paths, exclude_globs)? {
        let upload = match read_upload(&path) {
            Ok(u) => u,
            Err(e) => {
                report.skipped.push((path, format!("{:#}", e)));
                continue;
            }
        };
        let id = document_id(&upload.name);
        let outcome = extract(&upload).and_then(|text| report.store.put(id, text));
        if let Err(e) = outcome {
            warn!(path = %path.display(), error = %e, "skipping file");
            report.skipped.push((path, e.to_string()));
        }
    }
    Ok(report)
}

fn build_globset(patterns: impl IntoIterator<Item = String>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Invalid glob pattern: {}", pattern))?,
        );
    }
    Ok(builder.build()?)
}
