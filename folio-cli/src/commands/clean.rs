//! Clean command implementation

use anyhow::{Context, Result};
use folio_core::{Cleaner, CleanerConfig, Platform, RunReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Flags of `folio clean`
#[derive(Debug, Default)]
pub struct CleanOptions {
    pub platform: Option<Platform>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub parallel: bool,
    pub in_memory: bool,
}

impl CleanOptions {
    /// Config file first, then flags on top
    fn resolve(&self) -> Result<CleanerConfig> {
        let mut config = match &self.config {
            Some(path) => CleanerConfig::from_path(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => CleanerConfig::default(),
        };
        if let Some(platform) = self.platform {
            config = config.with_platform(platform);
        }
        if self.parallel {
            config = config.with_parallel(true);
        }
        if self.in_memory {
            config = config.with_in_memory(true);
        }
        Ok(config)
    }
}

/// Clean one EPUB
pub async fn clean(input: &Path, output: &Path, options: &CleanOptions) -> Result<()> {
    let config = options.resolve()?;
    tracing::debug!("Cleaning {} for {}", input.display(), config.platform);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Cleaning {}...", input.display()));

    let result = Cleaner::new(config).clean(input, output).await;
    pb.finish_and_clear();
    let report = result.with_context(|| format!("Failed to clean {}", input.display()))?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, output);
    }
    Ok(())
}

fn print_report(report: &RunReport, output: &Path) {
    println!("Cleaned '{}' for {} -> {}", report.title, report.platform, output.display());
    println!("Documents:   {}", report.documents);
    println!("Images:      {}", report.images);
    println!("Fonts:       {}", report.fonts);
    println!(
        "Footnotes:   {} ({} resolved)",
        report.footnotes, report.footnotes_resolved
    );
    println!("Spans:       {}", report.tracking_spans);
    println!("Links:       {}", report.links_retargeted);
    println!("SHA-256:     {}", report.archive_sha256);

    if !report.is_clean() {
        println!("Anomalies:");
        for anomaly in &report.anomalies {
            println!("  - {}", anomaly);
        }
    }
}
