//! Batch orchestration: discover → process → reduce → write.
//!
//! Images are processed concurrently (bounded by `processing.parallel_workers`)
//! but results come back in discovery order. Reduction is a barrier: it runs
//! once on the full set of successful records. Per-image failures are logged
//! and counted; model errors (at load or mid-batch) and artifact I/O fail a run.

use futures_util::stream::{self, StreamExt};
use ndarray::Array2;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::embedding::{ClipVisionEncoder, FeatureExtractor};
use crate::error::{PipelineError, Result};
use crate::output::ArtifactWriter;
use crate::reduce::{stack_rows, DimensionalityReducer, Pca, Tsne};
use crate::tagging::{ClipTextEncoder, Tagger, Vocabulary};
use crate::types::{ImageOutcome, ImageRecord, RunSummary};

use super::discovery::{DiscoveredFile, FileDiscovery};
use super::processor::ImageProcessor;

/// Everything a run needs, built once and shared read-only.
pub struct PipelineContext {
    pub config: Config,
    pub extractor: Arc<dyn FeatureExtractor>,
    pub tagger: Option<Arc<Tagger>>,
}

impl PipelineContext {
    pub fn new(
        config: Config,
        extractor: Arc<dyn FeatureExtractor>,
        tagger: Option<Arc<Tagger>>,
    ) -> Self {
        Self {
            config,
            extractor,
            tagger,
        }
    }

    /// Load the CLIP encoders and encode the tag vocabulary.
    ///
    /// Any failure here is a [`PipelineError::ModelLoad`] and ends the run.
    pub fn load(config: Config) -> std::result::Result<Self, PipelineError> {
        let model_dir = config.model_dir();
        let extractor = ClipVisionEncoder::load(&config.embedding, &model_dir)?;

        let tagger = if config.tagging.enabled {
            let vocabulary = Vocabulary::from_config(&config)?;
            let text_encoder =
                ClipTextEncoder::new(&config.embedding_model_dir(), config.embedding.device)?;
            let start = Instant::now();
            let tagger = Tagger::build(vocabulary, &text_encoder, &config.tagging)?;
            tracing::info!(
                "Encoded {} labels in {:.1}s",
                tagger.vocabulary().len(),
                start.elapsed().as_secs_f64()
            );
            Some(Arc::new(tagger))
        } else {
            None
        };

        Ok(Self::new(config, Arc::new(extractor), tagger))
    }
}

/// Progress notifications emitted during a run.
#[derive(Debug)]
pub enum Progress<'a> {
    /// Discovery finished
    Discovered { total: usize },
    /// One image finished, successfully or not
    Image { outcome: &'a ImageOutcome },
    /// Reduction started for the given number of records
    Reducing { records: usize },
    /// Artifacts are being written
    Writing,
}

type ProgressCallback = Box<dyn Fn(Progress<'_>) + Send + Sync>;

/// The batch pipeline over one source directory.
pub struct Pipeline {
    context: PipelineContext,
    discovery: FileDiscovery,
    processor: ImageProcessor,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    pub fn new(context: PipelineContext) -> Self {
        let discovery = FileDiscovery::new(context.config.processing.clone());
        let processor = ImageProcessor::new(
            context.config.limits.clone(),
            Arc::clone(&context.extractor),
            context.tagger.clone(),
        );
        Self {
            context,
            discovery,
            processor,
            progress: None,
        }
    }

    /// Register a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(Progress<'_>) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    fn notify(&self, event: Progress<'_>) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    /// Run the whole batch and write artifacts into `out_dir`.
    pub async fn run(&self, source: &Path, out_dir: &Path) -> Result<RunSummary> {
        let start = Instant::now();
        let config = &self.context.config;

        let files = self.discovery.discover(source)?;
        tracing::info!(
            "Found {} images in {:?} ({:.1} MB)",
            files.len(),
            source,
            FileDiscovery::total_size(&files) as f64 / (1024.0 * 1024.0)
        );
        self.notify(Progress::Discovered { total: files.len() });

        let outcomes = self.extract(&files).await?;

        let mut records = Vec::with_capacity(outcomes.len());
        let mut failed = 0;
        for outcome in outcomes {
            match outcome {
                ImageOutcome::Processed(record) => records.push(record),
                ImageOutcome::Failed { .. } => failed += 1,
            }
        }
        tracing::info!(
            "Extracted {} of {} images ({} skipped) with {}",
            records.len(),
            files.len(),
            failed,
            self.processor.extractor_name()
        );

        self.notify(Progress::Reducing {
            records: records.len(),
        });
        let reduced_2d = if config.reduction.enable_2d {
            let tsne = Tsne::from_config(&config.reduction);
            self.apply_reduction(tsne, &mut records, |record, row| {
                record.coords2d = Some([row[0], row[1]]);
            })
            .await
        } else {
            false
        };
        let reduced_3d = if config.reduction.enable_3d {
            let pca = Pca::from_config(&config.reduction);
            self.apply_reduction(pca, &mut records, |record, row| {
                record.coords3d = Some([row[0], row[1], row[2]]);
            })
            .await
        } else {
            false
        };

        self.notify(Progress::Writing);
        let artifacts = self.write_artifacts(&records, out_dir)?;

        let summary = RunSummary {
            discovered: files.len(),
            succeeded: records.len(),
            failed,
            reduced_2d,
            reduced_3d,
            artifacts,
            total_seconds: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            "Run finished in {:.1}s: {} succeeded, {} failed",
            summary.total_seconds,
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }

    /// Process every file, returning one outcome per file in input order.
    ///
    /// When two files share an id, the first in order wins and the later ones
    /// fail with [`PipelineError::DuplicateId`] without being decoded. An error
    /// that is not per-image (see [`PipelineError::is_per_image`]) stops the
    /// batch and is returned instead.
    pub async fn extract(
        &self,
        files: &[DiscoveredFile],
    ) -> std::result::Result<Vec<ImageOutcome>, PipelineError> {
        let mut seen = HashSet::new();
        let jobs: Vec<(&DiscoveredFile, bool)> = files
            .iter()
            .map(|file| (file, seen.insert(file.id.as_str())))
            .collect();

        let workers = self.context.config.processing.parallel_workers.max(1);
        let mut results = stream::iter(jobs)
            .map(|(file, first)| async move {
                if !first {
                    return Err(PipelineError::DuplicateId {
                        path: file.path.clone(),
                        id: file.id.clone(),
                    });
                }
                self.processor.process(file).await
            })
            .buffered(workers);

        let mut outcomes = Vec::with_capacity(files.len());
        let mut index = 0;
        while let Some(result) = results.next().await {
            let path = files[index].path.clone();
            index += 1;

            let outcome = match result {
                Ok(record) => ImageOutcome::Processed(record),
                Err(error) if !error.is_per_image() => {
                    tracing::error!("Stopping at {:?}: {}", path, error);
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!("Skipped {:?}: {}", path, error);
                    ImageOutcome::Failed { path, error }
                }
            };
            self.notify(Progress::Image { outcome: &outcome });
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Run `reducer` over all record vectors and store each output row.
    ///
    /// A failed reduction is logged and leaves every record without
    /// coordinates; the run continues.
    async fn apply_reduction<R, F>(
        &self,
        reducer: R,
        records: &mut [ImageRecord],
        assign: F,
    ) -> bool
    where
        R: DimensionalityReducer + 'static,
        F: Fn(&mut ImageRecord, &[f32]),
    {
        let components = reducer.components();
        let start = Instant::now();

        match reduce_records(reducer, records).await {
            Ok(coords) => {
                for (record, row) in records.iter_mut().zip(coords.rows()) {
                    let row: Vec<f32> = row.to_vec();
                    assign(record, &row);
                }
                tracing::info!(
                    "Reduced {} vectors to {}D in {:.2}s",
                    records.len(),
                    components,
                    start.elapsed().as_secs_f64()
                );
                true
            }
            Err(e) => {
                tracing::error!("{}D reduction failed: {}", components, e);
                false
            }
        }
    }

    /// Write the enabled artifacts; disabled stages leave their files alone.
    fn write_artifacts(&self, records: &[ImageRecord], out_dir: &Path) -> Result<Vec<PathBuf>> {
        let config = &self.context.config;
        let writer = ArtifactWriter::new(out_dir, config.output.pretty)?;
        let mut written = Vec::new();

        if config.reduction.enable_2d {
            written.push(writer.write_points_2d(records)?);
        }
        if config.reduction.enable_3d {
            written.push(writer.write_points_3d(records)?);
        }
        if self.processor.tagging_enabled() {
            written.push(writer.write_tags(records)?);
        }
        if config.output.include_vectors {
            written.push(writer.write_vectors(records)?);
        }

        tracing::info!("Wrote {} artifacts to {:?}", written.len(), writer.dir());
        Ok(written)
    }
}

/// Stack record vectors and reduce them on the blocking pool.
async fn reduce_records<R>(
    reducer: R,
    records: &[ImageRecord],
) -> std::result::Result<Array2<f32>, PipelineError>
where
    R: DimensionalityReducer + 'static,
{
    let vectors: Vec<&[f32]> = records.iter().map(|r| r.vector.as_slice()).collect();
    let data = stack_rows(&vectors)?;
    let expected = (records.len(), reducer.components());

    let coords = tokio::task::spawn_blocking(move || reducer.reduce(data.view()))
        .await
        .map_err(|e| PipelineError::Reduction {
            message: format!("Task join error: {}", e),
        })??;

    if coords.dim() != expected {
        return Err(PipelineError::Reduction {
            message: format!("Reducer returned {:?}, expected {:?}", coords.dim(), expected),
        });
    }
    Ok(coords)
}
