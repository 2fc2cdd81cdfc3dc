//! Structural Reorganizer
//!
//! Flattens every recognized file into its canonical subtree. Moves never
//! touch file contents; references are fixed later from the recorded
//! [`Relocation`]s.

use crate::assets::{self, NOTE_ICON_PATH};
use crate::layout::{self, AssetKind};
use crate::storage::{StorageProvider, StorageResult};
use serde::Serialize;
use std::collections::HashSet;

/// One file moved into a canonical subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    pub from: String,
    pub to: String,
    pub kind: AssetKind,
    /// The plain target name was taken and a suffix was added
    pub collided: bool,
}

/// Outcome of [`reorganize`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reorganization {
    /// Superseded package files that were deleted
    pub removed: Vec<String>,
    pub relocations: Vec<Relocation>,
}

impl Reorganization {
    pub fn collisions(&self) -> impl Iterator<Item = &Relocation> {
        self.relocations.iter().filter(|r| r.collided)
    }
}

/// Delete `superseded`, then move every classified file that is not already
/// in the directory for its kind.
pub async fn reorganize(storage: &dyn StorageProvider, superseded: &[String]) -> StorageResult<Reorganization> {
    let mut outcome = Reorganization::default();
    for path in superseded {
        if storage.exists(path).await? {
            tracing::debug!("Removing superseded {}", path);
            storage.delete(path).await?;
            outcome.removed.push(path.clone());
        }
    }

    // A previous run's icon is rewritten if still needed; anything else
    // stored under its name is a book image and moves aside below
    if storage.exists(NOTE_ICON_PATH).await? && assets::is_note_icon(&storage.read(NOTE_ICON_PATH).await?) {
        tracing::debug!("Removing note icon of an earlier run");
        storage.delete(NOTE_ICON_PATH).await?;
        outcome.removed.push(NOTE_ICON_PATH.to_string());
    }

    let files = storage.list("").await?;
    let mut occupied: HashSet<String> = files.iter().cloned().collect();
    // reserved for the note icon
    occupied.insert(NOTE_ICON_PATH.to_string());

    for path in &files {
        if layout::is_reserved(path) {
            continue;
        }
        let Some(kind) = AssetKind::classify(path) else {
            continue;
        };
        if layout::parent(path) == kind.dir() && path.as_str() != NOTE_ICON_PATH {
            continue;
        }

        let (to, collided) = free_name(kind.dir(), layout::file_name(path), &occupied);
        tracing::debug!("Moving {} -> {}", path, to);
        storage.rename(path, &to).await?;
        occupied.insert(to.clone());
        outcome.relocations.push(Relocation {
            from: path.clone(),
            to,
            kind,
            collided,
        });
    }

    Ok(outcome)
}

/// `dir/name`, or `dir/stem-n.ext` with the first free `n`
pub(crate) fn free_name(dir: &str, name: &str, occupied: &HashSet<String>) -> (String, bool) {
    let candidate = layout::join(dir, name);
    if !occupied.contains(&candidate) {
        return (candidate, false);
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };
    let mut n = 1;
    loop {
        let candidate = layout::join(dir, &format!("{stem}-{n}{ext}"));
        if !occupied.contains(&candidate) {
            return (candidate, true);
        }
        n += 1;
    }
}
