//! Validate command implementation

use anyhow::{bail, Context, Result};
use folio_core::inspect_archive;
use std::path::Path;

/// Check an EPUB against the canonical layout
pub async fn validate(input: &Path, json: bool) -> Result<()> {
    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to open input file: {}", input.display()))?;

    let report = inspect_archive(&data).with_context(|| format!("Failed to read {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_valid() {
        println!("Valid layout");
        println!("  Entries:    {}", report.entries);
        println!("  Manifest:   {}", report.manifest_items);
        println!("  Spine:      {}", report.spine_items);
        println!("  NavPoints:  {}", report.nav_points);
    } else {
        for violation in &report.violations {
            eprintln!("  - {}", violation);
        }
    }

    if !report.is_valid() {
        bail!(
            "Validation failed for {}: {} violation(s)",
            input.display(),
            report.violations.len()
        );
    }
    Ok(())
}
