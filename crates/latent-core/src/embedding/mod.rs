//! Image embedding generation.
//!
//! This module converts decoded images into fixed-length vectors with a CLIP
//! visual encoder running locally via ONNX Runtime. The orchestrator only sees
//! the [`FeatureExtractor`] trait, so tests can swap in a deterministic stub.
//!
//! # Usage
//!
//! ```rust,ignore
//! use latent_core::embedding::{ClipVisionEncoder, FeatureExtractor};
//! use latent_core::Config;
//!
//! let config = Config::default();
//! let encoder = ClipVisionEncoder::load(&config.embedding, &config.model_dir())?;
//! let raw = encoder.extract(&decoded_image, path)?;
//! // raw is a Vec<f32> with 512 elements, not yet normalized
//! ```

pub(crate) mod clip;
pub(crate) mod preprocess;

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;

use self::clip::ClipVisionSession;
use self::preprocess::preprocess;

/// The visual encoder ONNX model filename.
pub const VISION_MODEL_FILENAME: &str = "vision_model.onnx";

/// The text encoder ONNX model filename.
pub const TEXT_MODEL_FILENAME: &str = "text_model.onnx";

/// The tokenizer filename.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Converts one decoded image into a raw (unnormalized) embedding vector.
///
/// Implementations are shared read-only across image workers, hence
/// `Send + Sync`. They must be deterministic for a given input.
pub trait FeatureExtractor: Send + Sync {
    /// Produce the embedding for `image`; `path` is used for error context.
    fn extract(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError>;

    /// Short human-readable name for logs.
    fn name(&self) -> &str;
}

/// CLIP visual encoder backed by ONNX Runtime.
pub struct ClipVisionEncoder {
    session: ClipVisionSession,
    image_size: u32,
    model: String,
}

impl ClipVisionEncoder {
    /// Load the CLIP visual encoder from the model directory.
    ///
    /// Expects the ONNX model at `{model_dir}/{model_name}/vision_model.onnx`.
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let model_path = Self::model_path(config, model_dir);

        if !model_path.exists() {
            return Err(PipelineError::ModelLoad {
                message: format!(
                    "Vision model not found at {:?}. Run `latent models download` first.",
                    model_path
                ),
            });
        }

        tracing::info!("Loading CLIP vision model from {:?}", model_path);
        let session = ClipVisionSession::load(&model_path, config.device)?;
        tracing::info!("CLIP vision model loaded ({})", config.device);

        Ok(Self {
            session,
            image_size: config.image_size,
            model: config.model.clone(),
        })
    }

    /// Check whether the model files exist on disk.
    pub fn model_exists(config: &EmbeddingConfig, model_dir: &Path) -> bool {
        Self::model_path(config, model_dir).exists()
    }

    /// Get the expected model file path.
    pub fn model_path(config: &EmbeddingConfig, model_dir: &Path) -> PathBuf {
        model_dir.join(&config.model).join(VISION_MODEL_FILENAME)
    }
}

impl FeatureExtractor for ClipVisionEncoder {
    fn extract(&self, image: &DynamicImage, path: &Path) -> Result<Vec<f32>, PipelineError> {
        let tensor = preprocess(image, self.image_size);
        self.session.embed(&tensor, path)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path_layout() {
        let config = EmbeddingConfig::default();
        let path = ClipVisionEncoder::model_path(&config, Path::new("/models"));
        assert_eq!(
            path,
            PathBuf::from("/models/clip-vit-base-patch32/vision_model.onnx")
        );
    }

    #[test]
    fn test_load_missing_model_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingConfig::default();

        assert!(!ClipVisionEncoder::model_exists(&config, dir.path()));
        let err = ClipVisionEncoder::load(&config, dir.path()).err().unwrap();
        assert!(matches!(err, PipelineError::ModelLoad { .. }));
        assert!(!err.is_per_image());
    }
}
