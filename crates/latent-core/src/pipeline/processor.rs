//! Per-image processing: decode → extract → normalize → tag.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::LimitsConfig;
use crate::embedding::FeatureExtractor;
use crate::error::PipelineError;
use crate::math::l2_normalize;
use crate::tagging::Tagger;
use crate::types::ImageRecord;

use super::decode::ImageDecoder;
use super::discovery::DiscoveredFile;

/// Turns one discovered file into an [`ImageRecord`].
///
/// Holds shared handles to the model and tagger; cheap to share by reference
/// across concurrent image tasks.
pub struct ImageProcessor {
    decoder: ImageDecoder,
    extractor: Arc<dyn FeatureExtractor>,
    tagger: Option<Arc<Tagger>>,
}

impl ImageProcessor {
    pub fn new(
        limits: LimitsConfig,
        extractor: Arc<dyn FeatureExtractor>,
        tagger: Option<Arc<Tagger>>,
    ) -> Self {
        Self {
            decoder: ImageDecoder::new(limits),
            extractor,
            tagger,
        }
    }

    /// Process a single image.
    ///
    /// Every error returned here is per-image; the caller skips the file.
    pub async fn process(&self, file: &DiscoveredFile) -> Result<ImageRecord, PipelineError> {
        let start = Instant::now();
        let path = file.path.as_path();
        tracing::debug!("Processing: {:?}", path);

        let decoded = self.decoder.decode(path).await?;
        tracing::trace!("  Decode: {:?} ({}x{})", start.elapsed(), decoded.width, decoded.height);

        // Inference is CPU/GPU bound; keep it off the async workers
        let extract_start = Instant::now();
        let extractor = Arc::clone(&self.extractor);
        let owned_path = file.path.clone();
        let raw =
            tokio::task::spawn_blocking(move || extractor.extract(&decoded.image, &owned_path))
                .await
                .map_err(|e| PipelineError::Extraction {
                    path: path.to_path_buf(),
                    message: format!("Task join error: {}", e),
                })??;
        tracing::trace!("  Extract: {:?}", extract_start.elapsed());

        let vector = normalize(raw, path)?;

        let mut record = ImageRecord::new(file.id.clone(), vector);
        if let Some(tagger) = &self.tagger {
            let tags = tagger.tag(&record.vector).map_err(|e| PipelineError::Extraction {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            tracing::trace!(
                "  Tags: {}",
                tags.iter()
                    .map(|t| format!("{}={:.3}", t.name, t.similarity))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            record.tags = Some(tags.into_iter().map(|t| t.name).collect());
        }

        tracing::debug!("Processed {:?} in {:?}", file.id, start.elapsed());
        Ok(record)
    }

    /// Name of the underlying feature extractor.
    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    pub fn tagging_enabled(&self) -> bool {
        self.tagger.is_some()
    }
}

/// Put a raw embedding on the unit sphere, rejecting degenerate vectors.
fn normalize(raw: Vec<f32>, path: &Path) -> Result<Vec<f32>, PipelineError> {
    if raw.is_empty() {
        return Err(PipelineError::Extraction {
            path: path.to_path_buf(),
            message: "Model returned an empty embedding".to_string(),
        });
    }
    l2_normalize(&raw).ok_or_else(|| PipelineError::Extraction {
        path: path.to_path_buf(),
        message: "Embedding has zero or non-finite norm".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::l2_norm;
    use crate::tagging::{LabelBank, Vocabulary};
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::PathBuf;

    /// Mean RGB of the image, plus a constant so no vector is zero.
    struct MeanColor;

    impl FeatureExtractor for MeanColor {
        fn extract(&self, image: &DynamicImage, _path: &Path) -> Result<Vec<f32>, PipelineError> {
            let rgb = image.to_rgb8();
            let n = (rgb.width() * rgb.height()) as f32;
            let mut sums = [0.0_f32; 3];
            for p in rgb.pixels() {
                for c in 0..3 {
                    sums[c] += p[c] as f32;
                }
            }
            Ok(vec![sums[0] / n, sums[1] / n, sums[2] / n, 1.0])
        }

        fn name(&self) -> &str {
            "mean-color"
        }
    }

    struct Zero;

    impl FeatureExtractor for Zero {
        fn extract(&self, _image: &DynamicImage, _path: &Path) -> Result<Vec<f32>, PipelineError> {
            Ok(vec![0.0; 4])
        }

        fn name(&self) -> &str {
            "zero"
        }
    }

    fn png(dir: &Path, name: &str, color: [u8; 3]) -> DiscoveredFile {
        let path = dir.join(name);
        RgbImage::from_pixel(8, 8, Rgb(color)).save(&path).unwrap();
        DiscoveredFile {
            id: name.trim_end_matches(".png").to_string(),
            size: std::fs::metadata(&path).unwrap().len(),
            path,
        }
    }

    #[tokio::test]
    async fn test_record_is_unit_norm() {
        let dir = tempfile::tempdir().unwrap();
        let file = png(dir.path(), "red.png", [255, 0, 0]);

        let processor = ImageProcessor::new(LimitsConfig::default(), Arc::new(MeanColor), None);
        let record = processor.process(&file).await.unwrap();

        assert_eq!(record.id, "red");
        assert!((l2_norm(&record.vector) - 1.0).abs() < 1e-5);
        assert!(record.tags.is_none());
    }

    #[tokio::test]
    async fn test_zero_vector_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = png(dir.path(), "black.png", [0, 0, 0]);

        let processor = ImageProcessor::new(LimitsConfig::default(), Arc::new(Zero), None);
        let err = processor.process(&file).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { .. }));
    }

    #[tokio::test]
    async fn test_tags_attached() {
        let dir = tempfile::tempdir().unwrap();
        let file = png(dir.path(), "red.png", [255, 0, 0]);

        let vocabulary = Vocabulary::from_labels(["red", "green", "blue"]);
        let bank = LabelBank::from_rows(vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
        ])
        .unwrap();
        let tagger = Tagger::new(vocabulary, bank, 2).unwrap();

        let processor = ImageProcessor::new(
            LimitsConfig::default(),
            Arc::new(MeanColor),
            Some(Arc::new(tagger)),
        );
        let record = processor.process(&file).await.unwrap();
        let tags = record.tags.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0], "red");
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let processor = ImageProcessor::new(LimitsConfig::default(), Arc::new(MeanColor), None);
        let file = DiscoveredFile {
            path: PathBuf::from("/nonexistent/gone.png"),
            id: "gone".to_string(),
            size: 0,
        };
        assert!(processor.process(&file).await.is_err());
    }
}
