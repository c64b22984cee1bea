//! The `latent tags` command: corpus-wide tag frequencies.

use clap::Args;
use latent_core::output::{read_tags, tag_counts_json, TAGS_FILE};
use latent_core::{aggregate_tags, Config, TagCount};
use std::path::PathBuf;

use super::resolve_artifact;

/// Arguments for the `tags` command.
#[derive(Args, Debug)]
pub struct TagsArgs {
    /// Artifact directory or a tags.json file [default: output.dir from config]
    pub path: Option<PathBuf>,

    /// Only print the N most frequent tags
    #[arg(short = 'n', long)]
    pub top: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the tags command.
pub fn execute(args: TagsArgs, config: &Config) -> anyhow::Result<()> {
    let path = resolve_artifact(args.path.as_deref(), &config.output_dir(), TAGS_FILE);
    if !path.exists() {
        anyhow::bail!(
            "No tags file at {:?}\n\n  Hint: Run `latent run <SOURCE>` first.",
            path
        );
    }

    let counts = tag_table(&path, args.top)?;
    tracing::debug!("{} distinct tags in {:?}", counts.len(), path);
    println!("{}", tag_counts_json(&counts, args.pretty)?);
    Ok(())
}

fn tag_table(path: &std::path::Path, top: Option<usize>) -> anyhow::Result<Vec<TagCount>> {
    let tags = read_tags(path)?;
    let mut counts = aggregate_tags(&tags);
    if let Some(n) = top {
        counts.truncate(n);
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TAGS_FILE);
        std::fs::write(&path, r#"{"imgA": ["x", "y"], "imgB": ["x"]}"#).unwrap();

        let counts = tag_table(&path, None).unwrap();
        assert_eq!(
            serde_json::to_string(&counts).unwrap(),
            r#"[{"tag":"x","count":2},{"tag":"y","count":1}]"#
        );

        let top = tag_table(&path, Some(1)).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].tag, "x");
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let args = TagsArgs {
            path: Some(dir.path().to_path_buf()),
            top: None,
            pretty: false,
        };
        assert!(execute(args, &Config::default()).is_err());
    }
}
