//! Candidate image discovery in a source directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::PipelineError;

/// Finds image files by extension.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// A candidate image found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Record id: the file stem
    pub id: String,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Discover all supported image files at `path`, sorted by path.
    ///
    /// A single supported file is returned as-is. Directories are scanned one
    /// level deep unless `processing.recursive` is set.
    pub fn discover(&self, path: &Path) -> Result<Vec<DiscoveredFile>, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        if path.is_file() {
            let files = self
                .is_supported(path)
                .then(|| std::fs::metadata(path).ok())
                .flatten()
                .and_then(|meta| Self::candidate(path, meta.len()))
                .into_iter()
                .collect();
            return Ok(files);
        }

        let mut walker = WalkDir::new(path).follow_links(true).min_depth(1);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let entry_path = entry.path();
            if !entry_path.is_file() || !self.is_supported(entry_path) {
                continue;
            }
            match entry.metadata() {
                Ok(meta) => files.extend(Self::candidate(entry_path, meta.len())),
                Err(e) => tracing::warn!("Cannot stat {:?}: {}", entry_path, e),
            }
        }

        // Processing order is lexicographic so reruns are reproducible
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn candidate(path: &Path, size: u64) -> Option<DiscoveredFile> {
        let id = image_id(path)?;
        Some(DiscoveredFile {
            path: path.to_path_buf(),
            id,
            size,
        })
    }

    /// Check if a file has a supported extension (case-insensitive).
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

/// The record id for an image file: its name without the extension.
pub fn image_id(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}
