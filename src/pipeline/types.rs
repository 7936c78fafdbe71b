//! Events emitted by the execution pipeline.
//!
//! Workers never share counters. Every state change is sent as a
//! `TrackEvent` over a channel drained by a single reporter.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::FailureReason;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Converting,
    Copying,
    /// The add is complete.
    Done,
    /// The remove is complete.
    Deleted,
    Failed(FailureReason),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Deleted | Stage::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    pub action: Action,
    /// Destination file name.
    pub name: String,
    /// Target path for adds, existing path for removes.
    pub path: PathBuf,
    pub stage: Stage,
    /// Set when the event describes what a real run would do.
    pub dry_run: bool,
}

impl TrackEvent {
    pub(crate) fn add(name: &str, path: &std::path::Path, stage: Stage) -> Self {
        Self {
            action: Action::Add,
            name: name.to_string(),
            path: path.to_path_buf(),
            stage,
            dry_run: false,
        }
    }

    pub(crate) fn remove(name: &str, path: &std::path::Path, stage: Stage) -> Self {
        Self {
            action: Action::Remove,
            name: name.to_string(),
            path: path.to_path_buf(),
            stage,
            dry_run: false,
        }
    }

    pub(crate) fn simulated(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Shared stop flag. Work already started finishes; queued work is failed
/// with `FailureReason::Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
