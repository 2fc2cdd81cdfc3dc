//! Info command implementation

use anyhow::{Context, Result};
use folio_core::CleanerConfig;
use std::path::Path;

/// Display the package metadata of an EPUB
pub async fn info(input: &Path, json: bool) -> Result<()> {
    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to open input file: {}", input.display()))?;

    let info = folio_core::read_info(&data, &CleanerConfig::default())
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Title:       {}", info.metadata.title);
        if !info.metadata.author.is_empty() {
            println!("Author:      {}", info.metadata.author);
        }
        println!("Language:    {}", info.metadata.language);
        println!("Identifier:  {}", info.metadata.identifier);
        match &info.package_path {
            Some(path) => println!("Package:     {}", path),
            None => println!("Package:     (none)"),
        }
        if let Some(version) = &info.version {
            println!("Version:     {}", version);
        }
        if let Some(reason) = &info.degraded {
            println!("Degraded:    {}", reason);
        }
    }

    Ok(())
}
