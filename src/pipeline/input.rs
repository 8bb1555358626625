//! Input resolution: list the files a stage should process.
//!
//! Every stage walks a directory. Listings are sorted by file name so that
//! runs are reproducible and so the manifest builder can rely on byte-wise
//! lexicographic order when zipping the image and markdown trees.

use crate::config::{has_extension, DatasetConfig};
use crate::error::DatasetError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// All entries (files and directories) directly inside `dir`, sorted by name.
pub fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let read_err = |source| DatasetError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = std::fs::read_dir(dir)
        .map_err(read_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!("Listed {} entries in {}", entries.len(), dir.display());
    Ok(entries)
}

/// Regular files in `dir` carrying extension `ext` (case-insensitive), sorted.
pub fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, DatasetError> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && has_extension(p, ext))
        .collect())
}

/// Source documents in `config.docxs_dir`: regular files the config accepts
/// via [`DatasetConfig::is_source_document`], sorted.
pub fn source_documents(config: &DatasetConfig) -> Result<Vec<PathBuf>, DatasetError> {
    Ok(sorted_entries(&config.docxs_dir)?
        .into_iter()
        .filter(|p| p.is_file() && config.is_source_document(p))
        .collect())
}

/// File name without its extension, lossily converted to UTF-8.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Final path component, lossily converted to UTF-8.
pub fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Create `dir` (and parents) if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), DatasetError> {
    std::fs::create_dir_all(dir).map_err(|source| DatasetError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source,
    })
}
