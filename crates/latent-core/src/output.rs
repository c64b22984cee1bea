//! JSON artifacts consumed by the serving layer.
//!
//! Every artifact is written to a temporary sibling and renamed into place,
//! so readers never observe a half-written file. Output is deterministic:
//! arrays follow processing order and `tags.json` keys are sorted.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{ImageMetadata, ImageRecord, Point2d, Point3d, TagCount, VectorEntry};

/// 2D layout: `[{id, x, y}]`.
pub const EMBEDDINGS_2D_FILE: &str = "embeddings.json";
/// 3D layout: `[{id, x, y, z}]`.
pub const EMBEDDINGS_3D_FILE: &str = "embeddings3d.json";
/// Tags per image: `{id: [tag, ...]}`.
pub const TAGS_FILE: &str = "tags.json";
/// Normalized vectors: `[{id, vector}]`.
pub const VECTORS_FILE: &str = "vectors.json";
/// Display metadata: `[{id, title, url, tags}]`.
pub const METADATA_FILE: &str = "metadata.json";

/// Writes run artifacts into one output directory.
pub struct ArtifactWriter {
    dir: PathBuf,
    pretty: bool,
}

impl ArtifactWriter {
    /// Create a writer for `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, pretty: bool) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, pretty })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `embeddings.json` from records that carry 2D coordinates.
    pub fn write_points_2d(&self, records: &[ImageRecord]) -> Result<PathBuf> {
        let points: Vec<Point2d> = records
            .iter()
            .filter_map(|r| {
                r.coords2d.map(|[x, y]| Point2d {
                    id: r.id.clone(),
                    x,
                    y,
                })
            })
            .collect();
        self.write(EMBEDDINGS_2D_FILE, &points)
    }

    /// Write `embeddings3d.json` from records that carry 3D coordinates.
    pub fn write_points_3d(&self, records: &[ImageRecord]) -> Result<PathBuf> {
        let points: Vec<Point3d> = records
            .iter()
            .filter_map(|r| {
                r.coords3d.map(|[x, y, z]| Point3d {
                    id: r.id.clone(),
                    x,
                    y,
                    z,
                })
            })
            .collect();
        self.write(EMBEDDINGS_3D_FILE, &points)
    }

    /// Write `tags.json` for records that were tagged.
    pub fn write_tags(&self, records: &[ImageRecord]) -> Result<PathBuf> {
        let tags: BTreeMap<&str, &[String]> = records
            .iter()
            .filter_map(|r| r.tags.as_deref().map(|t| (r.id.as_str(), t)))
            .collect();
        self.write(TAGS_FILE, &tags)
    }

    /// Write `vectors.json`.
    pub fn write_vectors(&self, records: &[ImageRecord]) -> Result<PathBuf> {
        let entries: Vec<VectorEntry> = records
            .iter()
            .map(|r| VectorEntry {
                id: r.id.clone(),
                vector: r.vector.clone(),
            })
            .collect();
        self.write(VECTORS_FILE, &entries)
    }

    /// Write `metadata.json`.
    pub fn write_metadata(&self, metadata: &[ImageMetadata]) -> Result<PathBuf> {
        self.write(METADATA_FILE, metadata)
    }

    /// Serialize `value` to `name` atomically.
    pub fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));

        let mut buf = to_json(value, self.pretty)?.into_bytes();
        buf.push(b'\n');

        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&buf)?;
            file.sync_all()?;
        }
        if let Err(e) = std::fs::rename(&tmp, &target) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!("Wrote {:?} ({} bytes)", target, buf.len());
        Ok(target)
    }
}

/// Serialize an item to a JSON string.
pub fn to_json<T: Serialize + ?Sized>(item: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(item)?
    } else {
        serde_json::to_string(item)?
    };
    Ok(json)
}

/// Read a `tags.json` mapping.
pub fn read_tags(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    read_json(path)
}

/// Read `embeddings.json`.
pub fn read_points_2d(path: &Path) -> Result<Vec<Point2d>> {
    read_json(path)
}

/// Read `embeddings3d.json`; a missing or empty file is an empty layout.
pub fn read_points_3d(path: &Path) -> Result<Vec<Point3d>> {
    match std::fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Build the aggregated tag table written by `latent tags`.
pub fn tag_counts_json(counts: &[TagCount], pretty: bool) -> Result<String> {
    to_json(counts, pretty)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
