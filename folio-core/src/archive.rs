//! Archive Extractor and Repackager

use crate::error::{ContainerError, Result};
use crate::layout::{MIMETYPE, MIMETYPE_PATH};
use crate::storage::StorageProvider;
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// A file in or bound for the container
pub type Entry = (String, Vec<u8>);

fn container_error(e: ZipError) -> ContainerError {
    match e {
        ZipError::Io(io) => ContainerError::Unreadable(io.to_string()),
        other => ContainerError::Corrupt(other.to_string()),
    }
}

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_RESERVATION: u64 = 1 << 20;

/// Read every file entry of a zip container.
///
/// Entries whose names would escape the extraction root are rejected;
/// directory entries are skipped.
pub fn read_entries(data: &[u8]) -> std::result::Result<Vec<Entry>, ContainerError> {
    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(container_error)?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(container_error)?;
        if file.is_dir() {
            continue;
        }
        let name = file
            .enclosed_name()
            .and_then(tree_path)
            .ok_or_else(|| ContainerError::UnsafeEntry(file.name().to_string()))?;

        // declared sizes are not trusted beyond a modest reservation
        let mut content = Vec::with_capacity(file.size().min(MAX_RESERVATION) as usize);
        file.read_to_end(&mut content)
            .map_err(|e| ContainerError::Corrupt(format!("{name}: {e}")))?;
        entries.push((name, content));
    }

    Ok(entries)
}

/// `/`-joined path of an enclosed entry name
fn tree_path(path: &Path) -> Option<String> {
    let parts = path
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Unpack a container into the working tree, returning the file count
pub async fn extract(data: &[u8], storage: &dyn StorageProvider) -> Result<usize> {
    let entries = read_entries(data)?;
    let count = entries.len();
    for (name, content) in entries {
        storage.write(&name, content).await?;
    }
    Ok(count)
}

/// Serialize entries into a container: `mimetype` first and stored, every
/// other entry deflated.
pub fn write_archive(entries: &[Entry]) -> std::result::Result<Vec<u8>, ContainerError> {
    let write_error = |e: ZipError| ContainerError::Write(e.to_string());
    let io_error = |e: std::io::Error| ContainerError::Write(e.to_string());

    // Fixed timestamps keep the output reproducible
    let stored = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    let deflated = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mimetype = entries
        .iter()
        .find(|(name, _)| name == MIMETYPE_PATH)
        .map(|(_, content)| content.as_slice())
        .unwrap_or(MIMETYPE.as_bytes());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(MIMETYPE_PATH, stored).map_err(write_error)?;
    writer.write_all(mimetype).map_err(io_error)?;

    for (name, content) in entries.iter().filter(|(name, _)| name != MIMETYPE_PATH) {
        writer.start_file(name.as_str(), deflated).map_err(write_error)?;
        writer.write_all(content).map_err(io_error)?;
    }

    let cursor = writer.finish().map_err(write_error)?;
    Ok(cursor.into_inner())
}

/// Serialize the whole working tree
pub async fn pack(storage: &dyn StorageProvider) -> Result<Vec<u8>> {
    let mut entries = Vec::new();
    for path in storage.list("").await? {
        let content = storage.read(&path).await?;
        entries.push((path, content));
    }
    Ok(write_archive(&entries)?)
}
