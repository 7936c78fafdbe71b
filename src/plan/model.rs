use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::destination::DestinationEntry;
use crate::error::SkipReason;
use crate::playlist::Track;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Mirror the playlists: stale destination files are deleted.
    Sync,
    /// Only add; stale files stay and keep their slots.
    Append,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sync => f.write_str("sync"),
            Mode::Append => f.write_str("append"),
        }
    }
}

/// A track to copy and the folder slot reserved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub track: Track,
    pub folder_index: usize,
    /// Final destination path. Unique within the plan.
    pub target: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTrack {
    pub track: Track,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub mode: Mode,
    /// Copies in execution order.
    pub to_add: Vec<Placement>,
    /// Deletions. Always empty in append mode.
    pub to_remove: Vec<DestinationEntry>,
    /// Entries that already satisfy a requested track.
    pub unchanged: Vec<DestinationEntry>,
    /// Stale entries left alone in append mode.
    pub retained: Vec<DestinationEntry>,
    /// Tracks that found no slot.
    pub skipped: Vec<SkippedTrack>,
    /// Folders that must be created before copying.
    pub new_folders: Vec<usize>,
    /// Interrupted copies from an earlier run, to be cleaned up.
    pub partials: Vec<PathBuf>,
    /// Seed used to shuffle the new tracks, if shuffling was on.
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub to_add: usize,
    pub to_remove: usize,
    pub unchanged: usize,
    pub retained: usize,
    pub skipped: usize,
}

impl AllocationPlan {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            to_add: self.to_add.len(),
            to_remove: self.to_remove.len(),
            unchanged: self.unchanged.len(),
            retained: self.retained.len(),
            skipped: self.skipped.len(),
        }
    }

    /// True when executing the plan would not change the destination.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.partials.is_empty()
    }

    /// Tracks per folder once the plan has run: surviving entries plus additions.
    pub fn folder_occupancy(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        let surviving = self.unchanged.iter().chain(&self.retained);
        for folder in surviving
            .map(|e| e.folder_index)
            .chain(self.to_add.iter().map(|p| p.folder_index))
        {
            *counts.entry(folder).or_insert(0) += 1;
        }
        counts
    }
}
