//! Batch pipeline stages.
//!
//! - **discovery**: find candidate images in a source directory
//! - **decode**: load images with size, dimension and time limits
//! - **processor**: decode → embed → normalize → tag for one image
//! - **orchestrator**: run the batch, reduce, and write artifacts

pub mod decode;
pub mod discovery;
pub mod orchestrator;
pub mod processor;

pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{image_id, DiscoveredFile, FileDiscovery};
pub use orchestrator::{Pipeline, PipelineContext, Progress};
pub use processor::ImageProcessor;
