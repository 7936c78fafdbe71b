//! Destination inventory.
//!
//! The destination's folders and files are the only state that survives
//! between runs. `scan` turns them into a snapshot the planner compares
//! against the requested tracks.

mod layout;
mod scan;

pub use layout::FolderLayout;
pub use scan::*;

/// Suffix of in-flight copies. A file carrying it was interrupted mid-write.
pub const PARTIAL_SUFFIX: &str = ".playlistcopy-part";
