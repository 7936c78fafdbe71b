use std::collections::{BTreeSet, HashMap, hash_map::Entry};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::LibrarySettings;
use crate::error::{Result, SkipReason, Warning};
use crate::identity::Resolver;

use super::m3u::read_playlist;

/// A logical track to place on the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub identity: String,
    pub file_name: String,
    pub source_path: PathBuf,
    /// Playlists that referenced this track. Diagnostics only.
    pub origin_playlists: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub playlist: String,
    pub entry: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct Aggregation {
    /// Unique tracks in first-seen order.
    pub tracks: Vec<Track>,
    pub skipped: Vec<SkippedSource>,
    pub warnings: Vec<Warning>,
}

/// Read every playlist and merge their entries into one deduplicated list.
///
/// An unreadable playlist is fatal; an unreadable entry is only skipped.
pub fn aggregate(
    playlists: &[PathBuf],
    resolver: &Resolver,
    library: &LibrarySettings,
) -> Result<Aggregation> {
    info!(count = playlists.len(), "parsing playlists");

    let mut out = Aggregation::default();
    let mut by_identity: HashMap<String, usize> = HashMap::new();
    // Tags are read once per source file, however often it is listed.
    let mut resolved: HashMap<PathBuf, String> = HashMap::new();

    for playlist in playlists {
        let name = playlist_name(playlist);
        let entries = read_playlist(playlist)?;
        debug!(playlist = %name, entries = entries.len(), "playlist read");

        for entry in entries {
            if let Some(reason) = unavailable(&entry, library) {
                warn!(playlist = %name, entry = %entry.display(), %reason, "skipping entry");
                out.skipped.push(SkippedSource {
                    playlist: name.clone(),
                    entry,
                    reason,
                });
                continue;
            }

            let identity = match resolved.get(&entry) {
                Some(identity) => identity.clone(),
                None => {
                    let r = resolver.resolve(&entry);
                    if let Some(w) = r.warning {
                        warn!("{w}");
                        out.warnings.push(w);
                    }
                    resolved.insert(entry.clone(), r.identity.clone());

                    if let Entry::Vacant(slot) = by_identity.entry(r.identity.clone()) {
                        slot.insert(out.tracks.len());
                        out.tracks.push(Track {
                            identity: r.identity.clone(),
                            file_name: r.file_name,
                            source_path: entry.clone(),
                            origin_playlists: BTreeSet::new(),
                        });
                    }
                    r.identity
                }
            };

            if let Some(&idx) = by_identity.get(&identity) {
                out.tracks[idx].origin_playlists.insert(name.clone());
            }
        }
    }

    info!(
        tracks = out.tracks.len(),
        skipped = out.skipped.len(),
        "playlists aggregated"
    );
    Ok(out)
}

fn playlist_name(path: &Path) -> String {
    path.display().to_string()
}

fn unavailable(entry: &Path, library: &LibrarySettings) -> Option<SkipReason> {
    if !entry.is_file() {
        return Some(SkipReason::SourceUnavailable("file does not exist".into()));
    }
    if !library.is_audio_file(entry) {
        return Some(SkipReason::SourceUnavailable("not a supported audio file".into()));
    }
    if let Err(e) = std::fs::File::open(entry) {
        return Some(SkipReason::SourceUnavailable(e.to_string()));
    }
    None
}
