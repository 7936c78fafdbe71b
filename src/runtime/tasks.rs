use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{LayoutSettings, Settings};
use crate::destination::{self, FolderLayout};
use crate::error::{Error, SkipReason};
use crate::identity::Resolver;
use crate::pipeline::{self, Conversion, LameEncoder, PipelineOptions};
use crate::plan::{self, Mode};
use crate::playlist;
use crate::report::{self, Reporter, Verbosity};

/// Sync or append the playlists onto `destination`.
pub fn copy(
    mode: Mode,
    destination: &Path,
    playlists: &[PathBuf],
    settings: &Settings,
    dry_run: bool,
    verbosity: Verbosity,
) -> anyhow::Result<()> {
    if playlists.is_empty() {
        return Err(Error::config("at least one playlist is required").into());
    }

    let layout = FolderLayout::new(destination, &settings.layout)?;
    let resolver = Resolver::lofty(&settings.naming);

    let aggregation = playlist::aggregate(playlists, &resolver, &settings.library)?;
    if aggregation.tracks.is_empty() {
        return Err(Error::NoTracks.into());
    }

    let snapshot = destination::scan(&layout, &resolver, &settings.library)?;
    if !dry_run {
        ensure_writable(destination)?;
    }

    let seed = settings
        .placement
        .shuffle
        .then(|| settings.placement.seed.unwrap_or_else(rand::random));
    let plan = plan::plan(&aggregation.tracks, &snapshot, &layout, mode, seed);

    let out_of_room = plan
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::CapacityExceeded)
        .count();
    if plan.to_add.is_empty() && out_of_room > 0 {
        return Err(Error::CapacityExhausted {
            skipped: out_of_room,
        }
        .into());
    }

    let stdout = io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), verbosity);
    reporter.sources(&aggregation.skipped, &aggregation.warnings)?;
    reporter.destination(&snapshot)?;
    reporter.plan(&plan)?;

    if plan.is_noop() {
        info!(summary = ?plan.summary(), "destination already up to date");
    }

    if dry_run {
        reporter.consume(pipeline::dry_run(&plan))?;
    } else {
        let options = PipelineOptions {
            copy_workers: settings.workers.copy,
            convert_workers: settings.workers.convert,
            conversion: settings.convert.lame.as_ref().map(|lame| Conversion {
                encoder: Arc::new(LameEncoder::new(lame)),
                settings: settings.convert.clone(),
            }),
            ..PipelineOptions::default()
        };

        let run = pipeline::execute(&plan, options)?;
        let mut output = Ok(());
        for event in run.events().iter() {
            if let Err(e) = reporter.event(&event) {
                // Nobody is listening any more; finish the in-flight tracks only.
                warn!("lost console output, cancelling: {e}");
                run.cancel_handle().cancel();
                output = Err(e);
                break;
            }
        }
        run.wait();
        output?;
    }

    let summary = reporter.finish()?;
    info!(?summary, "run finished");
    Ok(())
}

/// Per-artist track counts for what is on `destination`.
pub fn stats(destination: &Path, settings: &Settings) -> anyhow::Result<()> {
    let layout = FolderLayout::new(destination, &settings.layout)?;
    // Artist names come from tags even when file names are kept as they are.
    let mut naming = settings.naming.clone();
    naming.rewrite_filenames = true;
    let resolver = Resolver::lofty(&naming);

    let mut entries = destination::scan(&layout, &resolver, &settings.library)?.entries;
    if !layout.is_bounded() {
        // Numbered folders from a bounded run count too; their capacity is irrelevant here.
        let foldered = LayoutSettings {
            tracks_per_folder: usize::MAX,
            ..settings.layout.clone()
        };
        let folders = FolderLayout::new(destination, &foldered)?;
        entries.extend(destination::scan(&folders, &resolver, &settings.library)?.entries);
    }
    let stats = report::artist_stats(&entries);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_stats(&mut out, &stats)?;
    out.flush()?;
    Ok(())
}

fn ensure_writable(destination: &Path) -> Result<(), Error> {
    let meta = fs::metadata(destination).map_err(|e| Error::io(destination, e))?;
    if meta.permissions().readonly() {
        return Err(Error::config(format!(
            "destination {} is not writable",
            destination.display()
        )));
    }
    Ok(())
}
