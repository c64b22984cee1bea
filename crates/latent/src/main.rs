//! Latent CLI - turn a folder of images into embeddings, layouts and tags.
//!
//! Latent embeds every image with CLIP, lays the collection out in 2D and 3D,
//! tags each image against a fixed vocabulary, and writes JSON artifacts for
//! a web front end to serve.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the CLIP model once
//! latent models download
//!
//! # Process a folder into ./data
//! latent run ./portfolio -o ./data
//!
//! # Corpus-wide tag counts
//! latent tags ./data
//!
//! # Join tags into display metadata
//! latent metadata ./data
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Latent - image embeddings, 2D/3D layouts and zero-shot tags.
#[derive(Parser, Debug)]
#[command(name = "latent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed, lay out and tag a directory of images
    Run(cli::run::RunArgs),

    /// Print the aggregated tag table
    Tags(cli::tags::TagsArgs),

    /// Join tags.json into metadata.json
    Metadata(cli::metadata::MetadataArgs),

    /// Manage CLIP models (download, list, path)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match latent_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `latent config path`."
            );
            latent_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Latent v{}", latent_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config).await,
        Commands::Tags(args) => cli::tags::execute(args, &config),
        Commands::Metadata(args) => cli::metadata::execute(args, &config),
        Commands::Models(args) => cli::models::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "latent", "-v", "run", "./images", "-o", "./out", "--top-k", "3", "--no-3d",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.source, std::path::PathBuf::from("./images"));
                assert_eq!(args.top_k, Some(3));
                assert!(args.no_3d);
                assert!(!args.no_2d);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tags_default_path() {
        let cli = Cli::try_parse_from(["latent", "tags"]).unwrap();
        assert!(matches!(cli.command, Commands::Tags(ref a) if a.path.is_none()));
    }

    #[test]
    fn test_run_requires_source() {
        assert!(Cli::try_parse_from(["latent", "run"]).is_err());
    }
}
