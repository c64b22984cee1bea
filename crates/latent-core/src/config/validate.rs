//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.processing.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.supported_formats must not be empty".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.embedding.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.image_size must be > 0".into(),
            ));
        }
        if !(self.reduction.perplexity > 0.0) {
            return Err(ConfigError::ValidationError(
                "reduction.perplexity must be > 0".into(),
            ));
        }
        if self.reduction.iterations == 0 {
            return Err(ConfigError::ValidationError(
                "reduction.iterations must be > 0".into(),
            ));
        }
        if !(self.reduction.learning_rate > 0.0) {
            return Err(ConfigError::ValidationError(
                "reduction.learning_rate must be > 0".into(),
            ));
        }
        if self.reduction.early_exaggeration < 1.0 {
            return Err(ConfigError::ValidationError(
                "reduction.early_exaggeration must be >= 1".into(),
            ));
        }
        if self.tagging.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "tagging.top_k must be > 0".into(),
            ));
        }
        if self.tagging.encode_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "tagging.encode_batch_size must be > 0".into(),
            ));
        }
        if !self.tagging.prompt_template.contains("{label}") {
            return Err(ConfigError::ValidationError(
                "tagging.prompt_template must contain {label}".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}
