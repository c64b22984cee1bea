//! The `latent metadata` command: join `tags.json` into `metadata.json`.

use clap::Args;
use latent_core::output::{read_tags, TAGS_FILE};
use latent_core::{ArtifactWriter, Config, ImageMetadata};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Arguments for the `metadata` command.
#[derive(Args, Debug)]
pub struct MetadataArgs {
    /// Artifact directory holding tags.json [default: output.dir from config]
    pub dir: Option<PathBuf>,

    /// Pretty-print metadata.json
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the metadata command.
pub fn execute(args: MetadataArgs, config: &Config) -> anyhow::Result<()> {
    let dir = args.dir.unwrap_or_else(|| config.output_dir());
    let tags_path = dir.join(TAGS_FILE);
    if !tags_path.exists() {
        anyhow::bail!(
            "No tags file at {:?}\n\n  Hint: Run `latent run <SOURCE>` first.",
            tags_path
        );
    }

    let metadata = build_metadata(read_tags(&tags_path)?);
    let writer = ArtifactWriter::new(&dir, args.pretty || config.output.pretty)?;
    let path = writer.write_metadata(&metadata)?;

    tracing::info!("Wrote metadata for {} images", metadata.len());
    println!("{}", path.display());
    Ok(())
}

/// One metadata entry per image, in id order.
fn build_metadata(tags: BTreeMap<String, Vec<String>>) -> Vec<ImageMetadata> {
    tags.into_iter()
        .map(|(id, tags)| ImageMetadata::from_tags(&id, tags))
        .collect()
}
