//! CLIP ONNX session management and inference.
//!
//! Loads CLIP encoders exported to ONNX and runs inference with the execution
//! provider chosen in configuration.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;

use crate::config::Device;
use crate::error::PipelineError;

/// Output holding the projected image embedding, in the text encoder's space.
const IMAGE_OUTPUT: &str = "image_embeds";

/// Fail unless the model exposes the projected image embedding.
///
/// Unprojected outputs such as `pooler_output` live in a different space (and
/// size) than the label embeddings, so they are not accepted.
fn check_image_output<'a>(
    outputs: impl IntoIterator<Item = &'a str>,
    model_path: &Path,
) -> Result<(), PipelineError> {
    let names: Vec<&str> = outputs.into_iter().collect();
    if names.contains(&IMAGE_OUTPUT) {
        Ok(())
    } else {
        Err(PipelineError::ModelLoad {
            message: format!(
                "Vision model {:?} has no {:?} output (found {:?})",
                model_path, IMAGE_OUTPUT, names
            ),
        })
    }
}

/// Build an ONNX Runtime session for `model_path` on `device`.
///
/// Requesting CUDA registers the CUDA execution provider; ONNX Runtime falls
/// back to CPU with a warning when it is not available.
pub(crate) fn build_session(model_path: &Path, device: Device) -> Result<Session, PipelineError> {
    let mut builder = Session::builder().map_err(|e| PipelineError::ModelLoad {
        message: format!("Failed to create ONNX session builder: {e}"),
    })?;

    if device == Device::Cuda {
        builder = builder
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .map_err(|e| PipelineError::ModelLoad {
                message: format!("Failed to register CUDA execution provider: {e}"),
            })?;
    }

    builder
        .commit_from_file(model_path)
        .map_err(|e| PipelineError::ModelLoad {
            message: format!("Failed to load ONNX model {:?}: {e}", model_path),
        })
}

/// Wraps an ONNX Runtime session for CLIP visual embedding.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`; concurrent
/// callers are serialized.
pub struct ClipVisionSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
}

impl ClipVisionSession {
    /// Load a CLIP visual encoder from an ONNX file.
    pub fn load(model_path: &Path, device: Device) -> Result<Self, PipelineError> {
        let session = build_session(model_path, device)?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());
        check_image_output(session.outputs().iter().map(|o| o.name()), model_path)?;

        tracing::debug!(
            "Loaded CLIP vision model from {:?} on {} (input: {:?}, outputs: {:?})",
            model_path,
            device,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }

    /// Run inference on a preprocessed image tensor and return the raw embedding.
    ///
    /// Input shape: \[1, 3, image_size, image_size\] (NCHW, CLIP-normalized).
    /// The result is not normalized; callers run it through the normalizer.
    pub fn embed(
        &self,
        preprocessed: &Array4<f32>,
        path: &Path,
    ) -> Result<Vec<f32>, PipelineError> {
        let shape: Vec<i64> = preprocessed.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = preprocessed.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| PipelineError::Extraction {
                path: path.to_path_buf(),
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        // A poisoned session breaks every later image, so it ends the run
        let mut session = self.session.lock().map_err(|e| PipelineError::ModelLoad {
            message: format!("Vision session lock poisoned: {e}"),
        })?;

        let outputs = session.run(inputs).map_err(|e| PipelineError::Extraction {
            path: path.to_path_buf(),
            message: format!("ONNX inference failed: {e}"),
        })?;

        let embeds = outputs
            .iter()
            .find(|(name, _)| *name == IMAGE_OUTPUT)
            .ok_or_else(|| PipelineError::Extraction {
                path: path.to_path_buf(),
                message: format!("Model produced no {:?} output", IMAGE_OUTPUT),
            })?;

        let (shape, data) =
            embeds
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Extraction {
                    path: path.to_path_buf(),
                    message: format!("Failed to extract embedding tensor: {e}"),
                })?;

        // image_embeds is [1, dim]
        let raw = match shape.len() {
            1 => data.to_vec(),
            2 => {
                let dim = shape[1] as usize;
                data[..dim].to_vec()
            }
            _ => {
                return Err(PipelineError::Extraction {
                    path: path.to_path_buf(),
                    message: format!("Unexpected embedding shape: {:?}", shape),
                });
            }
        };

        Ok(raw)
    }
}
