use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::error::{Error, Result, Warning};
use crate::identity::Resolver;

use super::PARTIAL_SUFFIX;
use super::layout::FolderLayout;

/// A file currently present on the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationEntry {
    pub identity: String,
    pub file_name: String,
    pub path: PathBuf,
    pub folder_index: usize,
    /// Position within the folder, by on-disk name.
    pub slot_index: usize,
    pub size: u64,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub entries: Vec<DestinationEntry>,
    /// Indices of folders that already exist.
    pub folders: BTreeSet<usize>,
    /// Interrupted copies left behind by an earlier run.
    pub partials: Vec<PathBuf>,
    /// Files that are not audio. Never touched.
    pub ignored: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.ends_with(PARTIAL_SUFFIX))
        .unwrap_or(false)
}

/// Children of `dir` at depth 1, sorted by name.
fn children(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                debug!(error = %err, "skipping unreadable destination entry");
                None
            }
        })
}

/// Inventory the destination under `layout`.
///
/// In bounded mode only folders whose names match the layout are read and
/// loose files in the root are ignored; in unbounded mode only the root's
/// files are read. Identities are derived with the same resolver used for
/// playlist entries.
pub fn scan(
    layout: &FolderLayout,
    resolver: &Resolver,
    library: &LibrarySettings,
) -> Result<Snapshot> {
    let root = layout.root();
    if !root.is_dir() {
        return Err(Error::config(format!(
            "destination {} is not a directory",
            root.display()
        )));
    }

    let mut snapshot = Snapshot::default();

    if layout.is_bounded() {
        for entry in children(root).filter(|e| e.file_type().is_dir()) {
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(index) = layout.parse_folder_name(name) else {
                debug!(dir = %entry.path().display(), "ignoring folder outside naming scheme");
                continue;
            };
            snapshot.folders.insert(index);
            scan_folder(entry.path(), index, resolver, library, &mut snapshot);
        }
    } else {
        snapshot.folders.insert(0);
        scan_folder(root, 0, resolver, library, &mut snapshot);
    }

    info!(
        entries = snapshot.entries.len(),
        folders = snapshot.folders.len(),
        partials = snapshot.partials.len(),
        "destination scanned"
    );
    Ok(snapshot)
}

fn scan_folder(
    dir: &Path,
    folder_index: usize,
    resolver: &Resolver,
    library: &LibrarySettings,
    snapshot: &mut Snapshot,
) {
    let mut slot_index = 0;

    for entry in children(dir).filter(|e| e.file_type().is_file()) {
        let path = entry.path();

        if is_partial(path) {
            snapshot.partials.push(path.to_path_buf());
            continue;
        }
        if !library.include_hidden && is_hidden(path) {
            continue;
        }
        if !library.is_audio_file(path) {
            snapshot.ignored.push(path.to_path_buf());
            continue;
        }

        let resolved = resolver.resolve(path);
        if let Some(w) = resolved.warning {
            debug!("{w}");
            snapshot.warnings.push(w);
        }

        snapshot.entries.push(DestinationEntry {
            identity: resolved.identity,
            file_name: entry.file_name().to_string_lossy().into_owned(),
            path: path.to_path_buf(),
            folder_index,
            slot_index,
            size: entry.metadata().map(|m| m.len()).unwrap_or(0),
            artist: resolved.artist,
        });
        slot_index += 1;
    }
}
