//! Latent Core - turn a folder of images into a browsable latent space.
//!
//! The pipeline embeds each image with CLIP, places the collection in 2D
//! (t-SNE) and 3D (PCA), tags each image against a fixed vocabulary, and
//! writes JSON artifacts for a presentation layer to read.
//!
//! # Architecture
//!
//! ```text
//! Images → Decode → Embed (CLIP) → Normalize → Tag ─┐
//!                                                   ├→ JSON artifacts
//!                   all vectors → t-SNE 2D / PCA 3D ┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use latent_core::{Config, Pipeline, PipelineContext};
//!
//! #[tokio::main]
//! async fn main() -> latent_core::Result<()> {
//!     let config = Config::load()?;
//!     let out_dir = config.output_dir();
//!     let context = PipelineContext::load(config)?;
//!
//!     let summary = Pipeline::new(context).run("./images".as_ref(), &out_dir).await?;
//!     println!("{} images laid out", summary.succeeded);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod reduce;
pub mod tagging;
pub mod types;

pub use config::{Config, Device};
pub use embedding::{ClipVisionEncoder, FeatureExtractor};
pub use error::{ConfigError, LatentError, PipelineError, PipelineResult, Result};
pub use output::ArtifactWriter;
pub use pipeline::{DiscoveredFile, FileDiscovery, Pipeline, PipelineContext, Progress};
pub use reduce::{DimensionalityReducer, Pca, Tsne};
pub use tagging::{aggregate_tags, Tagger, Vocabulary};
pub use types::{ImageMetadata, ImageOutcome, ImageRecord, RunSummary, Tag, TagCount};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
