//! `META-INF/container.xml`

use super::metadata::rootfile_path;
use crate::layout::{CONTAINER_PATH, PACKAGE_PATH};
use crate::storage::{StorageProvider, StorageResult};

fn container_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{PACKAGE_PATH}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#
    )
}

/// Keep a descriptor that already points at the canonical package document,
/// otherwise write one that does. Returns whether it was (re)written.
pub async fn ensure_container(storage: &dyn StorageProvider) -> StorageResult<bool> {
    if storage.exists(CONTAINER_PATH).await? {
        let existing = storage.read_text(CONTAINER_PATH).await?;
        if rootfile_path(&existing).as_deref() == Some(PACKAGE_PATH) {
            return Ok(false);
        }
    }
    tracing::debug!("Writing {}", CONTAINER_PATH);
    storage.write_text(CONTAINER_PATH, &container_xml()).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_missing_container_is_written() {
        let storage = MemoryStorage::new();
        assert!(ensure_container(&storage).await.unwrap());
        let xml = storage.read_text(CONTAINER_PATH).await.unwrap();
        assert_eq!(rootfile_path(&xml).as_deref(), Some(PACKAGE_PATH));
    }

    #[tokio::test]
    async fn test_canonical_container_is_kept() {
        let storage = MemoryStorage::new();
        let custom = r#"<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container"><rootfiles><rootfile full-path="OEBPS/content.opf"/></rootfiles><!-- keep --></container>"#;
        storage.write_text(CONTAINER_PATH, custom).await.unwrap();

        assert!(!ensure_container(&storage).await.unwrap());
        assert_eq!(storage.read_text(CONTAINER_PATH).await.unwrap(), custom);
    }

    #[tokio::test]
    async fn test_foreign_rootfile_is_replaced() {
        let storage = MemoryStorage::new();
        storage
            .write_text(CONTAINER_PATH, r#"<container><rootfiles><rootfile full-path="OPS/package.opf"/></rootfiles></container>"#)
            .await
            .unwrap();

        assert!(ensure_container(&storage).await.unwrap());
        assert!(storage.read_text(CONTAINER_PATH).await.unwrap().contains(PACKAGE_PATH));
    }
}
