//! Pre-computed label embeddings for fast scoring.
//!
//! The label bank stores a flat N×D matrix of unit-normalized text embeddings
//! (one row per vocabulary label) that image embeddings are dot-producted
//! against. It is built once per run and never mutated afterwards.

use crate::error::PipelineError;
use crate::math::l2_normalize;

use super::text_encoder::TextEncoder;
use super::vocabulary::Vocabulary;

/// Pre-computed label embeddings for scoring.
///
/// Stores a single flat matrix (N × D, row-major) for efficient dot products.
#[derive(Debug, Clone)]
pub struct LabelBank {
    /// Flat matrix: N × D stored row-major.
    matrix: Vec<f32>,
    embedding_dim: usize,
    label_count: usize,
}

impl LabelBank {
    /// Build a label bank from already-normalized rows.
    ///
    /// Fails if rows are ragged or any row is not unit length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, PipelineError> {
        let embedding_dim = rows.first().map(Vec::len).unwrap_or(0);
        let label_count = rows.len();
        let mut matrix = Vec::with_capacity(label_count * embedding_dim);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != embedding_dim {
                return Err(PipelineError::ModelLoad {
                    message: format!(
                        "Label embedding {} has {} dims, expected {}",
                        i,
                        row.len(),
                        embedding_dim
                    ),
                });
            }
            let norm = crate::math::l2_norm(&row);
            if (norm - 1.0).abs() > 1e-3 {
                return Err(PipelineError::ModelLoad {
                    message: format!("Label embedding {} is not unit length (norm {norm})", i),
                });
            }
            matrix.extend_from_slice(&row);
        }

        Ok(Self {
            matrix,
            embedding_dim,
            label_count,
        })
    }

    /// Encode all vocabulary labels and build the label bank.
    ///
    /// Each label is rendered through `template`, encoded in batches of
    /// `batch_size`, then L2-normalized. A label whose embedding has zero norm
    /// cannot be scored, so it fails the whole bank.
    pub fn encode_all(
        vocabulary: &Vocabulary,
        text_encoder: &dyn TextEncoder,
        template: &str,
        batch_size: usize,
    ) -> Result<Self, PipelineError> {
        let prompts = vocabulary.prompts(template);
        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(prompts.len());

        tracing::info!("Encoding {} vocabulary labels...", prompts.len());

        for chunk in prompts.chunks(batch_size.max(1)) {
            let embeddings = text_encoder.encode_batch(chunk)?;
            if embeddings.len() != chunk.len() {
                return Err(PipelineError::ModelLoad {
                    message: format!(
                        "Text encoder returned {} embeddings for {} prompts",
                        embeddings.len(),
                        chunk.len()
                    ),
                });
            }

            for (prompt, raw) in chunk.iter().zip(embeddings) {
                let unit = l2_normalize(&raw).ok_or_else(|| PipelineError::ModelLoad {
                    message: format!("Label prompt {:?} produced a zero-norm embedding", prompt),
                })?;
                rows.push(unit);
            }
        }

        let bank = Self::from_rows(rows)?;
        tracing::info!(
            "Label bank ready: {} labels x {} dims",
            bank.label_count,
            bank.embedding_dim
        );
        Ok(bank)
    }

    /// Cosine similarity of a unit image vector against every label, in
    /// vocabulary order.
    pub fn similarities(&self, image_embedding: &[f32]) -> Result<Vec<f32>, PipelineError> {
        if image_embedding.len() != self.embedding_dim {
            return Err(PipelineError::Extraction {
                path: Default::default(),
                message: format!(
                    "Image embedding has {} dims, label bank has {}",
                    image_embedding.len(),
                    self.embedding_dim
                ),
            });
        }

        Ok(self
            .matrix
            .chunks_exact(self.embedding_dim.max(1))
            .take(self.label_count)
            .map(|row| crate::math::dot(image_embedding, row))
            .collect())
    }

    /// Get the flat matrix.
    pub fn matrix(&self) -> &[f32] {
        &self.matrix
    }

    /// Get the embedding dimension.
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Get the number of labels in the bank.
    pub fn label_count(&self) -> usize {
        self.label_count
    }
}
