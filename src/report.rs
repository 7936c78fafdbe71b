//! Console output.
//!
//! The reporter is the only consumer of pipeline events; it owns every
//! counter shown to the user.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::destination::{DestinationEntry, Snapshot};
use crate::error::Warning;
use crate::pipeline::{Action, Stage, TrackEvent};
use crate::plan::AllocationPlan;
use crate::playlist::SkippedSource;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub retained: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Reporter<W: Write> {
    out: W,
    verbosity: Verbosity,
    adds_total: usize,
    adds_finished: usize,
    summary: RunSummary,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, verbosity: Verbosity) -> Self {
        Self {
            out,
            verbosity,
            adds_total: 0,
            adds_finished: 0,
            summary: RunSummary::default(),
        }
    }

    fn verbose(&self) -> bool {
        self.verbosity >= Verbosity::Verbose
    }

    fn normal(&self) -> bool {
        self.verbosity >= Verbosity::Normal
    }

    pub fn sources(&mut self, skipped: &[SkippedSource], warnings: &[Warning]) -> io::Result<()> {
        self.summary.skipped += skipped.len();
        if !self.normal() {
            return Ok(());
        }
        for s in skipped {
            writeln!(
                self.out,
                "skip   {} (in {}): {}",
                s.entry.display(),
                s.playlist,
                s.reason
            )?;
        }
        if self.verbose() {
            for w in warnings {
                writeln!(self.out, "warn   {w}")?;
            }
        }
        Ok(())
    }

    pub fn plan(&mut self, plan: &AllocationPlan) -> io::Result<()> {
        self.adds_total = plan.to_add.len();
        self.summary.unchanged = plan.unchanged.len();
        self.summary.retained = plan.retained.len();
        self.summary.skipped += plan.skipped.len();

        if !self.normal() {
            return Ok(());
        }

        writeln!(
            self.out,
            "Playlists contain {} new items ({} to remove, {} unchanged)",
            plan.to_add.len(),
            plan.to_remove.len(),
            plan.unchanged.len()
        )?;
        if let Some(seed) = plan.seed {
            writeln!(self.out, "Shuffle seed {seed}")?;
        }
        for s in &plan.skipped {
            writeln!(self.out, "skip   {}: {}", s.track.file_name, s.reason)?;
        }

        if self.verbose() {
            for e in &plan.unchanged {
                writeln!(self.out, "keep   {} ({} bytes)", e.path.display(), e.size)?;
            }
            for e in &plan.retained {
                writeln!(self.out, "leave  {}", e.path.display())?;
            }
            for e in &plan.to_remove {
                writeln!(self.out, "remove {}", e.path.display())?;
            }
            for p in &plan.to_add {
                writeln!(
                    self.out,
                    "add    {} -> {} (in {} playlist(s))",
                    p.track.source_path.display(),
                    p.target.display(),
                    p.track.origin_playlists.len()
                )?;
            }
            for i in &plan.new_folders {
                writeln!(self.out, "mkdir  folder #{}", i + 1)?;
            }
            for (i, n) in plan.folder_occupancy() {
                writeln!(self.out, "folder #{}: {n} tracks", i + 1)?;
            }
        }
        Ok(())
    }

    /// Destination files that were looked at but are not part of any decision.
    pub fn destination(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        if !self.verbose() {
            return Ok(());
        }
        for path in &snapshot.ignored {
            writeln!(self.out, "ignore {}", path.display())?;
        }
        for w in &snapshot.warnings {
            writeln!(self.out, "warn   {w}")?;
        }
        Ok(())
    }

    pub fn event(&mut self, event: &TrackEvent) -> io::Result<()> {
        if !event.stage.is_terminal() && !self.verbose() {
            return Ok(());
        }
        let prefix = if event.dry_run { "[dry-run] " } else { "" };

        match (&event.action, &event.stage) {
            (Action::Add, Stage::Done) => {
                self.summary.added += 1;
                self.adds_finished += 1;
                self.progress(prefix)?;
            }
            (Action::Remove, Stage::Deleted) => {
                self.summary.removed += 1;
                if self.verbose() {
                    writeln!(self.out, "{prefix}deleted {}", event.path.display())?;
                }
            }
            (action, Stage::Failed(reason)) => {
                self.summary.failed += 1;
                if *action == Action::Add {
                    self.adds_finished += 1;
                }
                if self.normal() {
                    writeln!(self.out, "{prefix}FAILED {}: {reason}", event.name)?;
                }
            }
            (_, stage) => {
                if self.verbose() {
                    writeln!(self.out, "{prefix}{:?} {}", stage, event.name)?;
                }
            }
        }
        Ok(())
    }

    fn progress(&mut self, prefix: &str) -> io::Result<()> {
        if !self.normal() || self.adds_total == 0 {
            return Ok(());
        }
        let pct = self.adds_finished as f64 / self.adds_total as f64 * 100.0;
        writeln!(
            self.out,
            "{prefix}Finished track {}/{} ({pct:.2}%)",
            self.adds_finished, self.adds_total
        )
    }

    pub fn consume<I>(&mut self, events: I) -> io::Result<()>
    where
        I: IntoIterator<Item = TrackEvent>,
    {
        for event in events {
            self.event(&event)?;
        }
        Ok(())
    }

    /// Print the closing summary and hand back the counts.
    pub fn finish(mut self) -> io::Result<RunSummary> {
        let s = self.summary;
        if self.normal() {
            writeln!(
                self.out,
                "Finished: {} added, {} removed, {} unchanged, {} left alone, {} skipped, {} failed",
                s.added, s.removed, s.unchanged, s.retained, s.skipped, s.failed
            )?;
        }
        self.out.flush()?;
        Ok(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistCount {
    pub artist: String,
    pub tracks: usize,
}

pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Per-artist track counts, most tracks first, ties by name.
pub fn artist_stats(entries: &[DestinationEntry]) -> Vec<ArtistCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for e in entries {
        *counts.entry(artist_of(e)).or_insert(0) += 1;
    }

    let mut stats: Vec<ArtistCount> = counts
        .into_iter()
        .map(|(artist, tracks)| ArtistCount { artist, tracks })
        .collect();
    stats.sort_by(|a, b| {
        b.tracks
            .cmp(&a.tracks)
            .then_with(|| a.artist.to_lowercase().cmp(&b.artist.to_lowercase()))
    });
    stats
}

/// Tag artist, else the part of an `Artist - Title` file name before the dash.
fn artist_of(entry: &DestinationEntry) -> String {
    if let Some(a) = entry.artist.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        return a.to_string();
    }
    std::path::Path::new(&entry.file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.split_once(" - "))
        .map(|(artist, _)| artist.trim())
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN_ARTIST)
        .to_string()
}

pub fn write_stats<W: Write>(out: &mut W, stats: &[ArtistCount]) -> io::Result<()> {
    let total: usize = stats.iter().map(|s| s.tracks).sum();
    if total == 0 {
        return writeln!(out, "No tracks on destination");
    }

    let width = stats.iter().map(|s| s.artist.chars().count()).max().unwrap_or(0);
    for s in stats {
        let pct = s.tracks as f64 / total as f64 * 100.0;
        writeln!(out, "{:<width$}  {:>5}  {:>6.2}%", s.artist, s.tracks, pct)?;
    }
    writeln!(out, "{total} tracks by {} artists", stats.len())
}
