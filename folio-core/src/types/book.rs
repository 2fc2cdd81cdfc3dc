//! The book being rebuilt

use super::{Document, FontAsset, ImageAsset, Metadata};
use crate::rewrite::FootnoteRegistry;

/// Transformation state owned by one pipeline run
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,

    /// Content documents in spine order
    pub documents: Vec<Document>,

    /// Images in canonical order
    pub images: Vec<ImageAsset>,

    /// Fonts by file name
    pub fonts: Vec<FontAsset>,

    pub footnotes: FootnoteRegistry,
}

impl Book {
    /// Create a book with existing metadata
    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    /// Add a document at the end of the spine
    pub fn add_document(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// The image filling the cover slot (`f2.*`), if any
    pub fn cover_image(&self) -> Option<&ImageAsset> {
        self.images
            .iter()
            .find(|image| crate::layout::file_stem(&image.canonical_name) == "f2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_image_is_first_sequence_slot() {
        let mut book = Book::default();
        book.images.push(ImageAsset {
            original_name: "OEBPS/Images/b.png".into(),
            canonical_name: "f3.png".into(),
            media_type: "image/png".into(),
        });
        assert!(book.cover_image().is_none());

        book.images.push(ImageAsset {
            original_name: "OEBPS/Images/a.jpg".into(),
            canonical_name: "f2.jpg".into(),
            media_type: "image/jpeg".into(),
        });
        assert_eq!(book.cover_image().map(|i| i.id()), Some("f2jpg".to_string()));
    }

    #[test]
    fn test_document_paths() {
        let document = Document {
            original_name: "OPS/ch1.html".into(),
            canonical_name: Document::canonical_name_for(0),
            title: "One".into(),
            raw_body: String::new(),
            rewritten_body: String::new(),
            tracking_spans: 0,
        };
        assert_eq!(document.id(), "f0");
        assert_eq!(document.path(), "OEBPS/Text/f0.xhtml");
        assert_eq!(document.href(), "Text/f0.xhtml");
    }
}
