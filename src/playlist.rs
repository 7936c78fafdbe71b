//! Playlist reading and aggregation.
//!
//! Playlists are read in command-line order and merged into one ordered list
//! of logical tracks, deduplicated by identity.

mod aggregate;
mod m3u;

pub use aggregate::*;
pub use m3u::read_playlist;
