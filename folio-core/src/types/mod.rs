//! In-flight state of one pipeline run

mod asset;
mod book;
mod document;
mod metadata;
mod package;

pub use asset::{FontAsset, ImageAsset};
pub use book::Book;
pub use document::Document;
pub use metadata::Metadata;
pub use package::{ManifestItem, NavPoint, SpineItem};
