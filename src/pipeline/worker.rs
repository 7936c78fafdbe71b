use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use crate::destination::PARTIAL_SUFFIX;
use crate::error::FailureReason;
use crate::plan::Placement;

use super::convert::Conversion;
use super::types::{CancelHandle, Stage, TrackEvent};

/// Work for the copy/delete pool.
#[derive(Debug)]
pub(super) enum CopyJob {
    Copy {
        placement: Placement,
        /// File to copy from: the source, or the encoder's output.
        from: PathBuf,
        /// Set when `from` is a scratch file owned by this job.
        scratch: bool,
    },
    Delete {
        name: String,
        path: PathBuf,
    },
}

pub(super) type SharedReceiver<T> = Arc<Mutex<Receiver<T>>>;

fn next_job<T>(rx: &SharedReceiver<T>) -> Option<T> {
    let guard = rx.lock().ok()?;
    guard.recv().ok()
}

fn emit(events: &Sender<TrackEvent>, event: TrackEvent) {
    // The reporter going away must not stop the file work.
    let _ = events.send(event);
}

pub(super) fn convert_worker(
    jobs: SharedReceiver<Placement>,
    copy_tx: Sender<CopyJob>,
    events: Sender<TrackEvent>,
    conversion: Conversion,
    scratch_dir: PathBuf,
    cancel: CancelHandle,
) {
    while let Some(placement) = next_job(&jobs) {
        let name = placement.track.file_name.clone();
        let target = placement.target.clone();

        if cancel.is_cancelled() {
            emit(
                &events,
                TrackEvent::add(&name, &target, Stage::Failed(FailureReason::Cancelled)),
            );
            continue;
        }

        emit(&events, TrackEvent::add(&name, &target, Stage::Converting));
        // File names are unique within a plan, so scratch paths never collide.
        let scratch = scratch_dir.join(&name);

        let converted = conversion.encoder.convert(
            &placement.track.source_path,
            &scratch,
            conversion.settings.bitrate_kbps,
        );

        match converted {
            Ok(()) => {
                debug!(track = %name, "converted");
                let job = CopyJob::Copy {
                    placement,
                    from: scratch.clone(),
                    scratch: true,
                };
                if copy_tx.send(job).is_err() {
                    let _ = fs::remove_file(&scratch);
                    emit(
                        &events,
                        TrackEvent::add(
                            &name,
                            &target,
                            Stage::Failed(FailureReason::CopyFailed("copy stage stopped".into())),
                        ),
                    );
                }
            }
            Err(e) => {
                warn!(track = %name, error = %e, "conversion failed");
                let _ = fs::remove_file(&scratch);
                emit(
                    &events,
                    TrackEvent::add(
                        &name,
                        &target,
                        Stage::Failed(FailureReason::ConversionFailed(e.to_string())),
                    ),
                );
            }
        }
    }
}

pub(super) fn copy_worker(
    jobs: SharedReceiver<CopyJob>,
    events: Sender<TrackEvent>,
    cancel: CancelHandle,
) {
    while let Some(job) = next_job(&jobs) {
        match job {
            CopyJob::Copy {
                placement,
                from,
                scratch,
            } => {
                let name = &placement.track.file_name;
                let target = &placement.target;

                let stage = if cancel.is_cancelled() {
                    Stage::Failed(FailureReason::Cancelled)
                } else {
                    emit(&events, TrackEvent::add(name, target, Stage::Copying));
                    match copy_into_place(&from, target) {
                        Ok(bytes) => {
                            info!(track = %name, target = %target.display(), bytes, "copied");
                            Stage::Done
                        }
                        Err(e) => {
                            error!(track = %name, error = %e, "copy failed");
                            Stage::Failed(FailureReason::CopyFailed(e.to_string()))
                        }
                    }
                };

                if scratch {
                    let _ = fs::remove_file(&from);
                }
                emit(&events, TrackEvent::add(name, target, stage));
            }
            CopyJob::Delete { name, path } => {
                let stage = if cancel.is_cancelled() {
                    Stage::Failed(FailureReason::Cancelled)
                } else {
                    match remove_if_present(&path) {
                        Ok(()) => {
                            info!(path = %path.display(), "deleted");
                            Stage::Deleted
                        }
                        Err(e) => {
                            error!(path = %path.display(), error = %e, "delete failed");
                            Stage::Failed(FailureReason::DeleteFailed(e.to_string()))
                        }
                    }
                };
                emit(&events, TrackEvent::remove(&name, &path, stage));
            }
        }
    }
}

/// Delete partial copies left by an interrupted run. Must finish before any
/// copy worker starts.
pub(super) fn remove_partials(partials: &[PathBuf]) {
    for path in partials {
        match remove_if_present(path) {
            Ok(()) => debug!(path = %path.display(), "removed partial copy"),
            Err(e) => warn!(path = %path.display(), error = %e, "cannot remove partial copy"),
        }
    }
}

pub(crate) fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}

/// Copy `from` next to `target` under a partial name, then rename it into
/// place. An interrupted copy leaves only the partial file behind.
fn copy_into_place(from: &Path, target: &Path) -> io::Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(target);
    let result = fs::copy(from, &partial).and_then(|bytes| {
        fs::rename(&partial, target)?;
        Ok(bytes)
    });

    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
