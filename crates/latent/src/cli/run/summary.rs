//! Progress bar and end-of-run summary.

use indicatif::{ProgressBar, ProgressStyle};
use latent_core::RunSummary;

/// Create the progress bar; its length is set once discovery finishes.
pub fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("discovering...");
    pb
}

/// Print a formatted summary table to stderr.
pub fn print_summary(summary: &RunSummary) {
    let rate = if summary.total_seconds > 0.0 {
        summary.succeeded as f64 / summary.total_seconds
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("    2D layout:    {:>8}", status(summary.reduced_2d));
    eprintln!("    3D layout:    {:>8}", status(summary.reduced_3d));
    eprintln!("  ------------------------------------");
    eprintln!("    Discovered:   {:>8}", summary.discovered);
    eprintln!("    Duration:     {:>7.1}s", summary.total_seconds);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
    for path in &summary.artifacts {
        eprintln!("    {}", path.display());
    }
}

fn status(done: bool) -> &'static str {
    if done {
        "done"
    } else {
        "skipped"
    }
}
