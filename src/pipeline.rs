//! Plan execution.
//!
//! Two bounded worker pools run the plan: one feeds tracks through the
//! external encoder, the other copies and deletes on the destination. A
//! converted track goes to the copy pool as soon as it is ready. Each worker
//! reports through a channel; a failed track never stops the others.
//!
//! The planner hands every add a distinct target path and keeps names of
//! files being deleted reserved, so workers never write the same path.

mod convert;
mod types;
mod worker;

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::plan::{AllocationPlan, Placement};

pub use convert::{ConvertError, Conversion, Encoder, LameEncoder};
pub use types::*;

use worker::{CopyJob, convert_worker, copy_worker, remove_partials};

#[derive(Clone)]
pub struct PipelineOptions {
    pub copy_workers: usize,
    pub convert_workers: usize,
    /// Down-conversion, when configured.
    pub conversion: Option<Conversion>,
    pub cancel: CancelHandle,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            copy_workers: 1,
            convert_workers: 1,
            conversion: None,
            cancel: CancelHandle::default(),
        }
    }
}

/// A running execution. Drain `events` until it closes, then `wait`.
pub struct PipelineRun {
    events: Receiver<TrackEvent>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancelHandle,
    // Conversion scratch space; removed once the workers are done.
    scratch: Option<TempDir>,
}

impl PipelineRun {
    pub fn events(&self) -> &Receiver<TrackEvent> {
        &self.events
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Join every worker and drop the scratch directory.
    pub fn wait(self) {
        for handle in self.workers {
            if handle.join().is_err() {
                tracing::error!("pipeline worker panicked");
            }
        }
        drop(self.scratch);
    }
}

/// Start executing `plan`. Fails only when the pipeline cannot be set up;
/// nothing on the destination has been touched in that case.
pub fn execute(plan: &AllocationPlan, options: PipelineOptions) -> Result<PipelineRun> {
    let (event_tx, event_rx) = mpsc::channel::<TrackEvent>();
    let (copy_tx, copy_rx) = mpsc::channel::<CopyJob>();
    let (convert_tx, convert_rx) = mpsc::channel::<Placement>();
    let copy_rx = Arc::new(Mutex::new(copy_rx));
    let convert_rx = Arc::new(Mutex::new(convert_rx));
    let cancel = options.cancel.clone();

    let conversion = options.conversion.filter(|c| {
        plan.to_add
            .iter()
            .any(|p| c.applies_to(&p.track.source_path))
    });

    let scratch = match &conversion {
        Some(_) => Some(
            tempfile::Builder::new()
                .prefix("playlistcopy-")
                .tempdir()
                .map_err(|e| Error::io(std::env::temp_dir(), e))?,
        ),
        None => None,
    };

    remove_partials(&plan.partials);

    let mut workers = Vec::new();

    for i in 0..options.copy_workers.max(1) {
        let jobs = copy_rx.clone();
        let events = event_tx.clone();
        let cancel = cancel.clone();
        workers.push(spawn(format!("copy-{i}"), move || {
            copy_worker(jobs, events, cancel)
        })?);
    }

    if let (Some(conversion), Some(dir)) = (&conversion, &scratch) {
        for i in 0..options.convert_workers.max(1) {
            let jobs = convert_rx.clone();
            let copy_tx = copy_tx.clone();
            let events = event_tx.clone();
            let conversion = conversion.clone();
            let dir = dir.path().to_path_buf();
            let cancel = cancel.clone();
            workers.push(spawn(format!("convert-{i}"), move || {
                convert_worker(jobs, copy_tx, events, conversion, dir, cancel)
            })?);
        }
    }

    info!(
        add = plan.to_add.len(),
        remove = plan.to_remove.len(),
        copy_workers = options.copy_workers,
        converting = conversion.is_some(),
        "executing plan"
    );

    enqueue(plan, conversion.as_ref(), &event_tx, &copy_tx, &convert_tx);
    // Workers stop once every sender is gone and their queue is drained.
    drop(copy_tx);
    drop(convert_tx);
    drop(event_tx);

    Ok(PipelineRun {
        events: event_rx,
        workers,
        cancel,
        scratch,
    })
}

fn spawn<F>(name: String, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(f)
        .map_err(Error::Worker)
}

fn enqueue(
    plan: &AllocationPlan,
    conversion: Option<&Conversion>,
    events: &Sender<TrackEvent>,
    copy_tx: &Sender<CopyJob>,
    convert_tx: &Sender<Placement>,
) {
    for entry in &plan.to_remove {
        let _ = events.send(TrackEvent::remove(&entry.file_name, &entry.path, Stage::Pending));
        let _ = copy_tx.send(CopyJob::Delete {
            name: entry.file_name.clone(),
            path: entry.path.clone(),
        });
    }

    for placement in &plan.to_add {
        let name = &placement.track.file_name;
        let _ = events.send(TrackEvent::add(name, &placement.target, Stage::Pending));

        let converts = conversion.is_some_and(|c| c.applies_to(&placement.track.source_path));
        if converts {
            debug!(track = %name, "queued for conversion");
            let _ = convert_tx.send(placement.clone());
        } else {
            let _ = copy_tx.send(CopyJob::Copy {
                placement: placement.clone(),
                from: placement.track.source_path.clone(),
                scratch: false,
            });
        }
    }
}

/// The events a real run of `plan` would produce, without touching anything.
pub fn dry_run(plan: &AllocationPlan) -> Vec<TrackEvent> {
    let mut events = Vec::with_capacity(2 * (plan.to_add.len() + plan.to_remove.len()));

    for entry in &plan.to_remove {
        for stage in [Stage::Pending, Stage::Deleted] {
            events.push(TrackEvent::remove(&entry.file_name, &entry.path, stage).simulated());
        }
    }
    for placement in &plan.to_add {
        let name = &placement.track.file_name;
        for stage in [Stage::Pending, Stage::Done] {
            events.push(TrackEvent::add(name, &placement.target, stage).simulated());
        }
    }

    events
}

#[cfg(test)]
mod tests;
