//! Core data types for the Latent pipeline.
//!
//! [`ImageRecord`] is the in-memory result for one image; the remaining
//! serializable types mirror the JSON artifacts read by the serving layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::PipelineError;

/// Everything the pipeline knows about one successfully processed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// File stem; unique within a run and equal to the thumbnail name
    pub id: String,

    /// Unit-normalized embedding vector
    pub vector: Vec<f32>,

    /// 2D layout position, present once the 2D reduction succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords2d: Option<[f32; 2]>,

    /// 3D layout position, present once the 3D reduction succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords3d: Option<[f32; 3]>,

    /// Ranked tags, most relevant first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ImageRecord {
    /// Create a record with just an id and its normalized vector.
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            coords2d: None,
            coords3d: None,
            tags: None,
        }
    }
}

/// Per-image result of the extraction stage.
#[derive(Debug)]
pub enum ImageOutcome {
    /// The image produced a record
    Processed(ImageRecord),
    /// The image was skipped
    Failed {
        /// Source file
        path: PathBuf,
        /// Why it was skipped
        error: PipelineError,
    },
}

impl ImageOutcome {
    /// The record, if processing succeeded.
    pub fn record(&self) -> Option<&ImageRecord> {
        match self {
            ImageOutcome::Processed(record) => Some(record),
            ImageOutcome::Failed { .. } => None,
        }
    }

    /// Whether processing succeeded.
    pub fn is_processed(&self) -> bool {
        matches!(self, ImageOutcome::Processed(_))
    }
}

/// A label assigned to an image with its cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// The label text (e.g., "urbanism")
    pub name: String,

    /// Cosine similarity between image and label embeddings
    pub similarity: f32,
}

impl Tag {
    /// Create a new tag with the given name and similarity.
    pub fn new(name: impl Into<String>, similarity: f32) -> Self {
        Self {
            name: name.into(),
            similarity,
        }
    }
}

/// One entry of `embeddings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point2d {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

/// One entry of `embeddings3d.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point3d {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One entry of `vectors.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub vector: Vec<f32>,
}

/// One row of the aggregated tag table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// One entry of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub id: String,
    pub title: String,
    pub url: String,
    pub tags: Vec<String>,
}

impl ImageMetadata {
    /// Derive display metadata for an image id.
    ///
    /// `"site-plan-v2"` becomes title `"Site Plan V2"` and url
    /// `"/thumbnails/site-plan-v2.jpg"`.
    pub fn from_tags(id: &str, tags: Vec<String>) -> Self {
        let title = id
            .split('-')
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: id.to_string(),
            title,
            url: format!("/thumbnails/{id}.jpg"),
            tags,
        }
    }
}

/// Capitalize the first letter of each alphabetic run, lowercase the rest.
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut at_start = true;
    for ch in word.chars() {
        if ch.is_alphabetic() {
            if at_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_start = false;
        } else {
            out.push(ch);
            at_start = true;
        }
    }
    out
}

/// Statistics for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunSummary {
    /// Candidate files found in the source directory
    pub discovered: usize,

    /// Images that produced a record
    pub succeeded: usize,

    /// Images that were skipped
    pub failed: usize,

    /// Whether the 2D layout was computed
    pub reduced_2d: bool,

    /// Whether the 3D layout was computed
    pub reduced_3d: bool,

    /// Artifact files written this run
    pub artifacts: Vec<PathBuf>,

    /// Total wall time in seconds
    pub total_seconds: f64,
}
