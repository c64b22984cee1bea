//! Top-K zero-shot tagging against the label bank.
//!
//! Image and label embeddings are both L2-normalized, so the dot product is
//! the cosine similarity. Ranking is a stable sort on similarity, which keeps
//! vocabulary order among ties.

use crate::config::TaggingConfig;
use crate::error::PipelineError;
use crate::types::Tag;

use super::label_bank::LabelBank;
use super::text_encoder::TextEncoder;
use super::vocabulary::Vocabulary;

/// Ranks image embeddings against a fixed, pre-encoded vocabulary.
///
/// Built once per run and shared read-only across image workers.
#[derive(Debug, Clone)]
pub struct Tagger {
    vocabulary: Vocabulary,
    label_bank: LabelBank,
    top_k: usize,
}

impl Tagger {
    /// Create a tagger from a vocabulary and its matching label bank.
    pub fn new(
        vocabulary: Vocabulary,
        label_bank: LabelBank,
        top_k: usize,
    ) -> Result<Self, PipelineError> {
        if vocabulary.len() != label_bank.label_count() {
            return Err(PipelineError::ModelLoad {
                message: format!(
                    "Vocabulary has {} labels but label bank has {} rows",
                    vocabulary.len(),
                    label_bank.label_count()
                ),
            });
        }
        Ok(Self {
            vocabulary,
            label_bank,
            top_k,
        })
    }

    /// Encode `vocabulary` once with `text_encoder` and build the tagger.
    pub fn build(
        vocabulary: Vocabulary,
        text_encoder: &dyn TextEncoder,
        config: &TaggingConfig,
    ) -> Result<Self, PipelineError> {
        let label_bank = LabelBank::encode_all(
            &vocabulary,
            text_encoder,
            &config.prompt_template,
            config.encode_batch_size,
        )?;
        Self::new(vocabulary, label_bank, config.top_k)
    }

    /// Score a unit image embedding and return the top-K labels.
    ///
    /// Tags are sorted by descending similarity; ties keep vocabulary order.
    /// Returns the whole vocabulary ranked when K exceeds its size.
    pub fn tag(&self, image_embedding: &[f32]) -> Result<Vec<Tag>, PipelineError> {
        let similarities = self.label_bank.similarities(image_embedding)?;

        let mut ranked: Vec<(usize, f32)> = similarities.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(self.top_k);

        let labels = self.vocabulary.labels();
        Ok(ranked
            .into_iter()
            .map(|(idx, similarity)| Tag::new(labels[idx].clone(), similarity))
            .collect())
    }

    /// The vocabulary this tagger ranks against.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}
