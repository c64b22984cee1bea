//! The `latent run` command: process a directory into artifacts.

mod setup;
mod summary;

use clap::{Args, ValueEnum};
use latent_core::{Config, Device, Pipeline, PipelineContext, Progress};
use std::path::PathBuf;
use std::time::Instant;

use setup::apply_overrides;
use summary::{create_progress_bar, print_summary};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image directory (or a single image) to process
    #[arg(required = true)]
    pub source: PathBuf,

    /// Output directory for artifacts [default: output.dir from config]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of images processed concurrently
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Tags kept per image
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Seed for the 2D/3D layouts
    #[arg(long)]
    pub seed: Option<u64>,

    /// Inference device
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,

    /// Tag vocabulary file (one label per line)
    #[arg(long)]
    pub vocabulary: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Skip zero-shot tagging
    #[arg(long)]
    pub no_tags: bool,

    /// Skip the 2D (t-SNE) layout
    #[arg(long)]
    pub no_2d: bool,

    /// Skip the 3D (PCA) layout
    #[arg(long)]
    pub no_3d: bool,

    /// Pretty-print JSON artifacts
    #[arg(long)]
    pub pretty: bool,
}

/// Device choices on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    Cpu,
    Cuda,
}

impl From<DeviceArg> for Device {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Cuda => Device::Cuda,
        }
    }
}

/// Execute the run command.
pub async fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.source.exists() {
        anyhow::bail!(
            "Source path does not exist: {:?}\n\n  Hint: Check the path and try again.",
            args.source
        );
    }

    apply_overrides(&mut config, &args);
    config.validate()?;

    let out_dir = args.output.clone().unwrap_or_else(|| config.output_dir());

    tracing::info!(
        "Loading {} on {} (tagging {})",
        config.embedding.model,
        config.embedding.device,
        if config.tagging.enabled { "on" } else { "off" }
    );
    let context = PipelineContext::load(config).map_err(|e| {
        anyhow::anyhow!("{e}\n\n  Hint: Run `latent models download` to fetch the CLIP model.")
    })?;

    let progress = create_progress_bar();
    let bar = progress.clone();
    let started = Instant::now();
    let pipeline = Pipeline::new(context).with_progress(move |event| match event {
        Progress::Discovered { total } => {
            bar.set_length(total as u64);
            bar.set_message("embedding...");
        }
        Progress::Image { .. } => {
            bar.inc(1);
            let elapsed = started.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                bar.set_message(format!("{:.1} img/sec", bar.position() as f64 / elapsed));
            }
        }
        Progress::Reducing { records } => {
            bar.set_message(format!("laying out {records} images..."));
        }
        Progress::Writing => bar.set_message("writing artifacts..."),
    });

    let summary = pipeline.run(&args.source, &out_dir).await?;

    progress.finish_and_clear();
    print_summary(&summary);

    Ok(())
}
