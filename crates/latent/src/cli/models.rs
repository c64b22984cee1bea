//! The `latent models` command for fetching and inspecting CLIP models.

use clap::{Args, Subcommand};
use latent_core::embedding::{TEXT_MODEL_FILENAME, TOKENIZER_FILENAME, VISION_MODEL_FILENAME};
use latent_core::Config;
use std::path::Path;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the CLIP vision encoder, text encoder and tokenizer
    Download {
        /// Model to fetch [default: embedding.model from config]
        #[arg(long)]
        model: Option<String>,

        /// Re-download files that already exist
        #[arg(long)]
        force: bool,
    },

    /// List known models and whether they are installed
    List,

    /// Show model directory path
    Path,
}

/// A CLIP checkpoint exported to ONNX on Hugging Face.
#[derive(Debug)]
struct ModelVariant {
    name: &'static str,
    label: &'static str,
    repo: &'static str,
}

const MODEL_VARIANTS: &[ModelVariant] = &[
    ModelVariant {
        name: "clip-vit-base-patch32",
        label: "CLIP ViT-B/32",
        repo: "Xenova/clip-vit-base-patch32",
    },
    ModelVariant {
        name: "clip-vit-base-patch16",
        label: "CLIP ViT-B/16",
        repo: "Xenova/clip-vit-base-patch16",
    },
];

/// (remote path in the repo, local file name)
const MODEL_FILES: &[(&str, &str)] = &[
    ("onnx/vision_model.onnx", VISION_MODEL_FILENAME),
    ("onnx/text_model.onnx", TEXT_MODEL_FILENAME),
    ("tokenizer.json", TOKENIZER_FILENAME),
];

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Download { model, force } => {
            let name = model.unwrap_or_else(|| config.embedding.model.clone());
            let variant = find_variant(&name)?;
            let client = reqwest::Client::new();
            download_variant(variant, &config.model_dir(), force, &client).await?;
            println!(
                "{} ready in {}",
                variant.label,
                config.model_dir().join(variant.name).display()
            );
        }

        ModelsCommand::List => {
            let model_dir = config.model_dir();
            println!("Models in {}:", model_dir.display());
            for variant in MODEL_VARIANTS {
                let marker = if variant.name == config.embedding.model { "*" } else { " " };
                let status = if is_installed(&model_dir.join(variant.name)) {
                    "installed"
                } else {
                    "not installed"
                };
                println!("  {marker} {:<24} {:<16} {status}", variant.name, variant.label);
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }
    }

    Ok(())
}

fn find_variant(name: &str) -> anyhow::Result<&'static ModelVariant> {
    MODEL_VARIANTS
        .iter()
        .find(|v| v.name == name)
        .ok_or_else(|| {
            let known: Vec<&str> = MODEL_VARIANTS.iter().map(|v| v.name).collect();
            anyhow::anyhow!("Unknown model {name:?}. Known models: {}", known.join(", "))
        })
}

/// Whether every file a variant needs is present in `dir`.
fn is_installed(dir: &Path) -> bool {
    MODEL_FILES.iter().all(|(_, local)| dir.join(local).exists())
}

/// Download all files for `variant` into `{model_dir}/{variant.name}`.
///
/// Existing files are kept unless `force` is set.
async fn download_variant(
    variant: &ModelVariant,
    model_dir: &Path,
    force: bool,
    client: &reqwest::Client,
) -> anyhow::Result<()> {
    let variant_dir = model_dir.join(variant.name);
    tokio::fs::create_dir_all(&variant_dir).await?;

    for (remote, local) in MODEL_FILES {
        let dest = variant_dir.join(local);
        if dest.exists() && !force {
            tracing::info!("{} already exists at {:?}", local, dest);
            continue;
        }

        let url = format!("https://huggingface.co/{}/resolve/main/{}", variant.repo, remote);
        tracing::info!("Downloading {} {}...", variant.label, local);
        tracing::info!("  Source: {}", url);
        tracing::info!("  Destination: {:?}", dest);

        download_file(client, &url, &dest).await?;

        let file_size = tokio::fs::metadata(&dest).await?.len();
        tracing::info!(
            "  {} complete ({:.1} MB)",
            local,
            file_size as f64 / (1024.0 * 1024.0)
        );
    }

    Ok(())
}

/// Stream a URL to `dest`.
///
/// Data goes to a `.part` sibling that is renamed on success, so an
/// interrupted download never looks installed.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let partial = partial_path(dest);
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;
    drop(file);

    if let Some(total) = total_size {
        if downloaded != total {
            let _ = tokio::fs::remove_file(&partial).await;
            anyhow::bail!(
                "Incomplete download for {}: got {} of {} bytes",
                dest.display(),
                downloaded,
                total
            );
        }
    }

    tokio::fs::rename(&partial, dest).await?;
    Ok(())
}

fn partial_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
