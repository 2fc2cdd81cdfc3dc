//! Images and fonts listed in the manifest

use crate::layout::{self, FONTS_DIR, IMAGES_DIR, OEBPS_DIR};
use serde::Serialize;

/// An image in `OEBPS/Images`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageAsset {
    /// Tree path before renaming
    pub original_name: String,
    /// File name after renaming (`f2.jpg`)
    pub canonical_name: String,
    pub media_type: String,
}

impl ImageAsset {
    /// Manifest id derived from the file name (`f2.jpg` -> `f2jpg`)
    pub fn id(&self) -> String {
        layout::sanitize_id(&self.canonical_name)
    }

    pub fn path(&self) -> String {
        layout::join(IMAGES_DIR, &self.canonical_name)
    }

    pub fn href(&self) -> String {
        layout::relative_href(OEBPS_DIR, &self.path())
    }
}

/// A font in `OEBPS/Fonts`; fonts keep their names
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FontAsset {
    pub file_name: String,
    pub media_type: String,
}

impl FontAsset {
    pub fn id(&self) -> String {
        layout::sanitize_id(&self.file_name)
    }

    pub fn path(&self) -> String {
        layout::join(FONTS_DIR, &self.file_name)
    }

    pub fn href(&self) -> String {
        layout::relative_href(OEBPS_DIR, &self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_href_is_percent_encoded() {
        let font = FontAsset {
            file_name: "Old Style #2.ttf".to_string(),
            media_type: "application/x-font-ttf".to_string(),
        };
        assert_eq!(font.path(), "OEBPS/Fonts/Old Style #2.ttf");
        assert_eq!(font.href(), "Fonts/Old%20Style%20%232.ttf");
    }

    #[test]
    fn test_image_href_is_relative_to_package() {
        let image = ImageAsset {
            original_name: "OEBPS/Images/cover.jpeg".to_string(),
            canonical_name: "f2.jpg".to_string(),
            media_type: "image/jpeg".to_string(),
        };
        assert_eq!(image.href(), "Images/f2.jpg");
        assert_eq!(image.id(), "f2jpg");
    }
}
