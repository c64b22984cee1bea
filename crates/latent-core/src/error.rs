//! Error types for the Latent pipeline.
//!
//! Errors are organized by stage. Per-image variants of [`PipelineError`] are
//! recovered by the orchestrator (skip and log); [`PipelineError::ModelLoad`]
//! is fatal for a run.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Latent operations.
#[derive(Error, Debug)]
pub enum LatentError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed (corrupt file, truncated data)
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// Model inference failed on a decodable image
    #[error("Extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    /// Another file in the batch already produced this id
    #[error("Duplicate id {id:?} for {path}")]
    DuplicateId { path: PathBuf, id: String },

    /// The embedding model or tag vocabulary could not be initialized
    #[error("Model load failed: {message}")]
    ModelLoad { message: String },

    /// Dimensionality reduction could not run on the batch
    #[error("Reduction failed: {message}")]
    Reduction { message: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Whether this error only affects a single image.
    ///
    /// Per-image errors are skipped by the orchestrator; everything else ends the run.
    pub fn is_per_image(&self) -> bool {
        !matches!(
            self,
            PipelineError::ModelLoad { .. } | PipelineError::Reduction { .. }
        )
    }
}

/// Convenience type alias for Latent results.
pub type Result<T> = std::result::Result<T, LatentError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
