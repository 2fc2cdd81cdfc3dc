//! Image renaming and the fixed stylesheet and icon assets

use crate::layout::{self, AssetKind, FONTS_DIR, IMAGES_DIR, STYLES_DIR};
use crate::storage::{StorageProvider, StorageResult};
use crate::types::{FontAsset, ImageAsset};

/// Font-face declarations with local fallbacks
pub const FONTS_STYLESHEET: &str = "OEBPS/Styles/fonts.css";
/// Layout and typography rules
pub const LAYOUT_STYLESHEET: &str = "OEBPS/Styles/style.css";
/// Icon used by image-icon footnote references
pub const NOTE_ICON_PATH: &str = "OEBPS/Images/footnote.png";

const FONTS_CSS: &str = include_str!("../assets/fonts.css");
const LAYOUT_CSS: &str = include_str!("../assets/style.css");
const NOTE_ICON: &[u8] = include_bytes!("../assets/footnote.png");

/// First number of the image sequence; `f2` is the cover slot
const FIRST_IMAGE_NUMBER: usize = 2;

/// Media type for an image extension
pub fn image_media_type(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "image/jpeg",
    }
}

/// Media type for a font extension
pub fn font_media_type(extension: &str) -> &'static str {
    match extension {
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/x-font-ttf",
    }
}

/// Assign canonical names to the images directly under `OEBPS/Images`.
///
/// Images are taken in lexicographic order of path and numbered from `f2`;
/// extensions are lowercased and `.jpeg` becomes `.jpg`.
pub fn plan_images(files: &[String]) -> Vec<ImageAsset> {
    let mut images: Vec<&String> = files
        .iter()
        .filter(|path| layout::parent(path) == IMAGES_DIR)
        .filter(|path| path.as_str() != NOTE_ICON_PATH)
        .filter(|path| AssetKind::classify(path) == Some(AssetKind::Image))
        .collect();
    images.sort();

    images
        .into_iter()
        .enumerate()
        .filter_map(|(i, path)| {
            let extension = match layout::extension(path)?.as_str() {
                "jpeg" => "jpg".to_string(),
                other => other.to_string(),
            };
            Some(ImageAsset {
                original_name: path.clone(),
                canonical_name: format!("f{}.{}", FIRST_IMAGE_NUMBER + i, extension),
                media_type: image_media_type(&extension).to_string(),
            })
        })
        .collect()
}

/// Rename planned images in two phases, so a new name may be an old one
pub async fn rename_images(storage: &dyn StorageProvider, images: &[ImageAsset]) -> StorageResult<usize> {
    let pending: Vec<(usize, &ImageAsset)> = images
        .iter()
        .enumerate()
        .filter(|(_, image)| image.original_name != image.path())
        .collect();

    for (i, image) in &pending {
        storage
            .rename(&image.original_name, &staging_path(*i))
            .await?;
    }
    for (i, image) in &pending {
        tracing::debug!("Image {} -> {}", image.original_name, image.path());
        storage.rename(&staging_path(*i), &image.path()).await?;
    }
    Ok(pending.len())
}

fn staging_path(index: usize) -> String {
    layout::join(IMAGES_DIR, &format!(".folio-staging-{index}"))
}

/// Fonts directly under `OEBPS/Fonts`, by file name
pub fn collect_fonts(files: &[String]) -> Vec<FontAsset> {
    let mut fonts: Vec<FontAsset> = files
        .iter()
        .filter(|path| layout::parent(path) == FONTS_DIR)
        .filter(|path| AssetKind::classify(path) == Some(AssetKind::Font))
        .filter_map(|path| {
            let extension = layout::extension(path)?;
            Some(FontAsset {
                file_name: layout::file_name(path).to_string(),
                media_type: font_media_type(&extension).to_string(),
            })
        })
        .collect();
    fonts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    fonts
}

/// Write the two fixed stylesheets
pub async fn write_stylesheets(storage: &dyn StorageProvider) -> StorageResult<()> {
    debug_assert!(FONTS_STYLESHEET.starts_with(STYLES_DIR));
    storage.write_text(FONTS_STYLESHEET, FONTS_CSS).await?;
    storage.write_text(LAYOUT_STYLESHEET, LAYOUT_CSS).await?;
    Ok(())
}

/// Whether `bytes` are the icon an earlier run wrote
pub(crate) fn is_note_icon(bytes: &[u8]) -> bool {
    bytes == NOTE_ICON
}

/// Write the footnote icon and describe it for the manifest
pub async fn write_note_icon(storage: &dyn StorageProvider) -> StorageResult<ImageAsset> {
    storage.write(NOTE_ICON_PATH, NOTE_ICON.to_vec()).await?;
    Ok(ImageAsset {
        original_name: NOTE_ICON_PATH.to_string(),
        canonical_name: layout::file_name(NOTE_ICON_PATH).to_string(),
        media_type: image_media_type("png").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_plan_images_sorts_and_normalizes() {
        let files = paths(&[
            "OEBPS/Images/b.PNG",
            "OEBPS/Images/a.JPEG",
            "OEBPS/Images/footnote.png",
            "OEBPS/Images/sub/c.gif",
            "OEBPS/Images/notes.txt",
            "OEBPS/Text/x.png",
        ]);
        let plan = plan_images(&files);

        let names: Vec<_> = plan.iter().map(|i| i.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["f2.jpg", "f3.png"]);
        assert_eq!(plan[0].original_name, "OEBPS/Images/a.JPEG");
        assert_eq!(plan[0].media_type, "image/jpeg");
        assert_eq!(plan[1].media_type, "image/png");
    }

    #[test]
    fn test_font_media_types() {
        let fonts = collect_fonts(&paths(&[
            "OEBPS/Fonts/b.woff2",
            "OEBPS/Fonts/a.TTF",
            "OEBPS/Fonts/readme.txt",
        ]));
        let listed: Vec<_> = fonts
            .iter()
            .map(|f| (f.file_name.as_str(), f.media_type.as_str()))
            .collect();
        assert_eq!(
            listed,
            vec![("a.TTF", "application/x-font-ttf"), ("b.woff2", "font/woff2")]
        );
        assert_eq!(image_media_type("svg"), "image/svg+xml");
    }

    #[tokio::test]
    async fn test_rename_swaps_without_clobbering() {
        let storage = MemoryStorage::new();
        storage.write("OEBPS/Images/f3.png", b"first".to_vec()).await.unwrap();
        storage.write("OEBPS/Images/f2.png", b"second".to_vec()).await.unwrap();
        storage.write("OEBPS/Images/a.png", b"zeroth".to_vec()).await.unwrap();

        let files = storage.list("").await.unwrap();
        let plan = plan_images(&files);
        // a.png, f2.png, f3.png -> f2, f3, f4
        let renamed = rename_images(&storage, &plan).await.unwrap();
        assert_eq!(renamed, 3);

        assert_eq!(storage.read("OEBPS/Images/f2.png").await.unwrap(), b"zeroth");
        assert_eq!(storage.read("OEBPS/Images/f3.png").await.unwrap(), b"second");
        assert_eq!(storage.read("OEBPS/Images/f4.png").await.unwrap(), b"first");
        assert_eq!(storage.list("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fixed_assets_are_written() {
        let storage = MemoryStorage::new();
        write_stylesheets(&storage).await.unwrap();
        let icon = write_note_icon(&storage).await.unwrap();

        assert!(storage.read_text(FONTS_STYLESHEET).await.unwrap().contains("@font-face"));
        assert!(storage.read_text(LAYOUT_STYLESHEET).await.unwrap().contains("duokan-footnote"));
        assert_eq!(icon.href(), "Images/footnote.png");
        assert!(storage.read(NOTE_ICON_PATH).await.unwrap().starts_with(b"\x89PNG"));
    }
}
