//! Allocation planning.
//!
//! Given the requested tracks and a destination snapshot, decide which
//! tracks to copy and where, which files to delete, and which are already
//! in place. Planning never touches the filesystem.

mod model;
mod placement;

pub use model::*;
pub use placement::plan;
