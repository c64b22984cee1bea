//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.latent/models"),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of images processed concurrently
    pub parallel_workers: usize,

    /// Supported input extensions (matched case-insensitively)
    pub supported_formats: Vec<String>,

    /// Descend into subdirectories of the source directory
    pub recursive: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            supported_formats: ["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            recursive: false,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Compute device for ONNX inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Portable CPU execution
    #[default]
    Cpu,
    /// CUDA execution provider (falls back to CPU if unavailable)
    Cuda,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Square input size expected by the vision encoder
    pub image_size: u32,

    /// Compute device
    pub device: Device,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "clip-vit-base-patch32".to_string(),
            image_size: 224,
            device: Device::Cpu,
        }
    }
}

/// Dimensionality reduction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Produce the 2D layout (`embeddings.json`)
    pub enable_2d: bool,

    /// Produce the 3D layout (`embeddings3d.json`)
    pub enable_3d: bool,

    /// Random seed shared by both reducers
    pub seed: u64,

    /// t-SNE perplexity (effective neighborhood size)
    pub perplexity: f64,

    /// t-SNE gradient descent iterations
    pub iterations: usize,

    /// t-SNE learning rate
    pub learning_rate: f64,

    /// t-SNE early exaggeration factor
    pub early_exaggeration: f64,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            enable_2d: true,
            enable_3d: true,
            seed: 42,
            perplexity: 30.0,
            iterations: 1000,
            learning_rate: 200.0,
            early_exaggeration: 12.0,
        }
    }
}

/// Tagging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Whether zero-shot tagging is enabled
    pub enabled: bool,

    /// Number of tags kept per image
    pub top_k: usize,

    /// Inline candidate labels (ignored when `vocabulary_file` is set)
    pub labels: Vec<String>,

    /// Optional file with one label per line
    pub vocabulary_file: Option<String>,

    /// Text fed to the encoder for each label; `{label}` is substituted
    pub prompt_template: String,

    /// Labels encoded per text-encoder call
    pub encode_batch_size: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: 5,
            labels: [
                "parametric",
                "site-analysis",
                "water-filtration",
                "spring-2024",
                "urbanism",
                "ecology",
                "digital",
                "diagram",
                "ai-generated",
                "render",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            vocabulary_file: None,
            prompt_template: "{label}".to_string(),
            encode_batch_size: 64,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the artifacts are written to
    pub dir: PathBuf,

    /// Pretty-print JSON artifacts
    pub pretty: bool,

    /// Also write `vectors.json` with the normalized embeddings
    pub include_vectors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            pretty: true,
            include_vectors: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
