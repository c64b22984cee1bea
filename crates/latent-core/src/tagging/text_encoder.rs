//! CLIP text encoder for embedding tag labels.
//!
//! Loads the CLIP text ONNX model and tokenizer, and encodes label prompts to
//! vectors in the same space as the vision encoder's image embeddings.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::config::Device;
use crate::embedding::clip::build_session;
use crate::embedding::{TEXT_MODEL_FILENAME, TOKENIZER_FILENAME};
use crate::error::PipelineError;

/// CLIP's fixed text context length.
const MAX_LENGTH: usize = 77;

/// Output names tried in order for the projected text embedding.
const TEXT_OUTPUTS: &[&str] = &["text_embeds", "pooler_output"];

/// Encodes text prompts into raw (unnormalized) embedding vectors.
pub trait TextEncoder: Send + Sync {
    /// Encode a batch of prompts, returning one vector per prompt in order.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

/// CLIP text encoder wrapper.
///
/// Uses the same `Mutex<Session>` pattern as the vision encoder.
pub struct ClipTextEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    /// Whether the exported graph declares an `attention_mask` input.
    takes_attention_mask: bool,
}

impl ClipTextEncoder {
    /// Load the text encoder from a model directory.
    ///
    /// Expects `text_model.onnx` and `tokenizer.json` in `model_dir`.
    pub fn new(model_dir: &Path, device: Device) -> Result<Self, PipelineError> {
        let text_model_path = model_dir.join(TEXT_MODEL_FILENAME);
        let tokenizer_path = model_dir.join(TOKENIZER_FILENAME);

        if !text_model_path.exists() {
            return Err(PipelineError::ModelLoad {
                message: format!(
                    "Text encoder not found at {:?}. Run `latent models download` first.",
                    text_model_path
                ),
            });
        }

        if !tokenizer_path.exists() {
            return Err(PipelineError::ModelLoad {
                message: format!(
                    "Tokenizer not found at {:?}. Run `latent models download` first.",
                    tokenizer_path
                ),
            });
        }

        let session = build_session(&text_model_path, device)?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            PipelineError::ModelLoad {
                message: format!("Failed to load tokenizer: {e}"),
            }
        })?;

        let takes_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        tracing::debug!(
            "Loaded CLIP text encoder (inputs: {:?}, outputs: {:?})",
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            takes_attention_mask,
        })
    }

    /// Check whether the text encoder model files exist.
    pub fn model_exists(model_dir: &Path) -> bool {
        model_dir.join(TEXT_MODEL_FILENAME).exists() && model_dir.join(TOKENIZER_FILENAME).exists()
    }
}

impl TextEncoder for ClipTextEncoder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = texts.len();
        if batch_size == 0 {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| PipelineError::ModelLoad {
                message: format!("Tokenization failed: {e}"),
            })?;

        // Zero-padded to the fixed context. CLIP pools at the end-of-text
        // token, so a truncated prompt keeps its final token.
        let mut input_ids = vec![0i64; batch_size * MAX_LENGTH];
        let mut attention_mask = vec![0i64; batch_size * MAX_LENGTH];
        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let row = i * MAX_LENGTH;
            for (j, &id) in ids.iter().take(MAX_LENGTH).enumerate() {
                input_ids[row + j] = id as i64;
                attention_mask[row + j] = 1;
            }
            if ids.len() > MAX_LENGTH {
                if let Some(&last) = ids.last() {
                    input_ids[row + MAX_LENGTH - 1] = last as i64;
                }
            }
        }

        let shape = vec![batch_size as i64, MAX_LENGTH as i64];
        let input_ids_value =
            Value::from_array((shape.clone(), input_ids)).map_err(|e| PipelineError::ModelLoad {
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::ModelLoad {
            message: format!("Text encoder lock poisoned: {e}"),
        })?;

        let outputs = if self.takes_attention_mask {
            let mask_value =
                Value::from_array((shape, attention_mask)).map_err(|e| PipelineError::ModelLoad {
                    message: format!("Failed to create attention mask tensor: {e}"),
                })?;
            session.run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => mask_value
            ])
        } else {
            session.run(ort::inputs!["input_ids" => input_ids_value])
        }
        .map_err(|e| PipelineError::ModelLoad {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        let embeds = TEXT_OUTPUTS
            .iter()
            .find_map(|wanted| outputs.iter().find(|(name, _)| *name == *wanted))
            .ok_or_else(|| PipelineError::ModelLoad {
                message: format!("Text encoder produced none of the outputs {:?}", TEXT_OUTPUTS),
            })?;

        let (_shape, data) =
            embeds
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::ModelLoad {
                    message: format!("Failed to extract text embeddings: {e}"),
                })?;

        let embedding_dim = data.len() / batch_size;
        let embeddings: Vec<Vec<f32>> = data
            .chunks(embedding_dim.max(1))
            .take(batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_exists_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!ClipTextEncoder::model_exists(dir.path()));

        std::fs::write(dir.path().join(TEXT_MODEL_FILENAME), b"").unwrap();
        assert!(!ClipTextEncoder::model_exists(dir.path()));

        std::fs::write(dir.path().join(TOKENIZER_FILENAME), b"{}").unwrap();
        assert!(ClipTextEncoder::model_exists(dir.path()));
    }

    #[test]
    fn test_missing_text_model_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClipTextEncoder::new(dir.path(), Device::Cpu).err().unwrap();
        assert!(err.to_string().contains("Text encoder not found"));
    }
}
