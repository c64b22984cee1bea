//! Subcommand implementations.

pub mod config;
pub mod metadata;
pub mod models;
pub mod run;
pub mod tags;

use std::path::{Path, PathBuf};

/// Resolve an artifact from an optional directory-or-file argument.
///
/// A directory (or no argument, meaning `default_dir`) resolves to
/// `{dir}/{file_name}`; anything else is taken as the file itself.
pub(crate) fn resolve_artifact(arg: Option<&Path>, default_dir: &Path, file_name: &str) -> PathBuf {
    match arg {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path.to_path_buf(),
        None => default_dir.join(file_name),
    }
}
