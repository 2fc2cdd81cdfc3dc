//! Package, navigation and container documents
//!
//! Reading recovers book metadata from whatever package document the input
//! carries. Writing regenerates all three documents from the [`Book`]
//! so they always agree with the files actually emitted.
//!
//! [`Book`]: crate::types::Book

pub mod container;
pub mod metadata;
pub mod ncx;
pub mod opf;

pub use container::ensure_container;
pub use metadata::{read_package, PackageInfo};
pub use ncx::{nav_points, render_ncx};
pub use opf::{manifest_items, render_opf, spine_items};

pub(crate) const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";
pub(crate) const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
pub(crate) const NCX_NAMESPACE: &str = "http://www.daisy.org/z3986/2005/ncx/";

pub(crate) const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
pub(crate) const CSS_MEDIA_TYPE: &str = "text/css";
pub(crate) const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// Convert written XML bytes to text
pub(crate) fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
