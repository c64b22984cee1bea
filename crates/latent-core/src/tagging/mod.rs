//! Zero-shot image tagging via the CLIP text encoder.
//!
//! Labels are encoded once into a [`LabelBank`]; each image is then ranked
//! against it by cosine similarity. [`aggregate_tags`] builds the corpus-wide
//! frequency table from the resulting `tags.json` mapping.

pub mod aggregate;
pub mod label_bank;
pub mod scorer;
pub mod text_encoder;
pub mod vocabulary;

pub use aggregate::aggregate_tags;
pub use label_bank::LabelBank;
pub use scorer::Tagger;
pub use text_encoder::{ClipTextEncoder, TextEncoder};
pub use vocabulary::Vocabulary;
