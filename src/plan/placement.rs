use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::destination::{DestinationEntry, FolderLayout, Snapshot};
use crate::error::SkipReason;
use crate::identity::identity_key;
use crate::playlist::Track;

use super::model::{AllocationPlan, Mode, Placement, SkippedTrack};

/// Compute the allocation plan.
///
/// Existing entries never move. New tracks are packed first-fit into the
/// lowest folder with room, opening folders up to the layout's ceiling.
/// With `shuffle_seed` set, only the order of the new tracks is permuted
/// before packing. Without it the result depends on the inputs alone.
pub fn plan(
    desired: &[Track],
    snapshot: &Snapshot,
    layout: &FolderLayout,
    mode: Mode,
    shuffle_seed: Option<u64>,
) -> AllocationPlan {
    let wanted: HashSet<&str> = desired.iter().map(|t| t.identity.as_str()).collect();

    // Matching. A second file with an already-matched identity is stale.
    let mut present: HashSet<&str> = HashSet::new();
    let mut unchanged = Vec::new();
    let mut stale = Vec::new();
    for entry in &snapshot.entries {
        if wanted.contains(entry.identity.as_str()) && present.insert(entry.identity.as_str()) {
            unchanged.push(entry.clone());
        } else {
            stale.push(entry.clone());
        }
    }

    let (to_remove, retained) = match mode {
        Mode::Sync => (stale, Vec::new()),
        Mode::Append => (Vec::new(), stale),
    };

    let mut needs_add: Vec<&Track> = desired
        .iter()
        .filter(|t| !present.contains(t.identity.as_str()))
        .collect();

    if let Some(seed) = shuffle_seed {
        let mut rng = StdRng::seed_from_u64(seed);
        needs_add.shuffle(&mut rng);
        debug!(seed, tracks = needs_add.len(), "shuffled new tracks");
    }

    let mut slots = Slots::new(layout, &unchanged, &retained, &to_remove);
    let mut to_add = Vec::with_capacity(needs_add.len());
    let mut skipped = Vec::new();

    for track in needs_add {
        match slots.claim(&track.file_name) {
            Ok(folder_index) => to_add.push(Placement {
                track: track.clone(),
                folder_index,
                target: layout.folder_path(folder_index).join(&track.file_name),
            }),
            Err(reason) => {
                warn!(track = %track.file_name, %reason, "track not placed");
                skipped.push(SkippedTrack {
                    track: track.clone(),
                    reason,
                });
            }
        }
    }

    let mut new_folders: Vec<usize> = to_add
        .iter()
        .map(|p| p.folder_index)
        .filter(|i| layout.is_bounded() && !snapshot.folders.contains(i))
        .collect();
    new_folders.sort_unstable();
    new_folders.dedup();

    info!(
        %mode,
        add = to_add.len(),
        remove = to_remove.len(),
        unchanged = unchanged.len(),
        skipped = skipped.len(),
        "plan computed"
    );

    AllocationPlan {
        mode,
        to_add,
        to_remove,
        unchanged,
        retained,
        skipped,
        new_folders,
        partials: snapshot.partials.clone(),
        seed: shuffle_seed,
    }
}

/// Free capacity and taken names per folder.
struct Slots<'a> {
    layout: &'a FolderLayout,
    used: HashMap<usize, usize>,
    /// Lowercased names per folder. Names of files being deleted stay taken
    /// so a copy never races a delete on the same path.
    names: HashSet<(usize, String)>,
    /// Every folder below this index is full.
    cursor: usize,
}

impl<'a> Slots<'a> {
    fn new(
        layout: &'a FolderLayout,
        unchanged: &[DestinationEntry],
        retained: &[DestinationEntry],
        removed: &[DestinationEntry],
    ) -> Self {
        let mut used = HashMap::new();
        for e in unchanged.iter().chain(retained) {
            *used.entry(e.folder_index).or_insert(0) += 1;
        }
        let names = unchanged
            .iter()
            .chain(retained)
            .chain(removed)
            .map(|e| (e.folder_index, identity_key(&e.file_name)))
            .collect();

        Self {
            layout,
            used,
            names,
            cursor: 0,
        }
    }

    fn has_room(&self, folder: usize) -> bool {
        match self.layout.capacity() {
            Some(cap) => self.used.get(&folder).copied().unwrap_or(0) < cap,
            None => true,
        }
    }

    fn claim(&mut self, file_name: &str) -> Result<usize, SkipReason> {
        let key = identity_key(file_name);
        let mut conflict = false;

        for folder in self.cursor..self.layout.max_folders() {
            if !self.has_room(folder) {
                if folder == self.cursor {
                    self.cursor += 1;
                }
                continue;
            }
            if self.names.contains(&(folder, key.clone())) {
                conflict = true;
                continue;
            }
            *self.used.entry(folder).or_insert(0) += 1;
            self.names.insert((folder, key));
            return Ok(folder);
        }

        Err(if conflict {
            SkipReason::NameConflict
        } else {
            SkipReason::CapacityExceeded
        })
    }
}
