//! Track identity resolution.
//!
//! A track's identity is the lowercased target file name. With rewriting on,
//! the name comes from `artist - album - title` tags; otherwise, or when the
//! tags are missing, from the file's own stem. The same rules run on source
//! and destination files so the two sides compare symmetrically.

mod normalize;
mod tags;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::NamingSettings;
use crate::error::Warning;

pub use normalize::identity_key;
pub use tags::{AudioFormat, LoftyTagReader, TagError, TagReader, TrackTags};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Canonical comparison key.
    pub identity: String,
    /// File name to use on the destination.
    pub file_name: String,
    /// Artist tag when it was read.
    pub artist: Option<String>,
    pub warning: Option<Warning>,
}

#[derive(Clone)]
pub struct Resolver {
    reader: Arc<dyn TagReader>,
    rewrite: bool,
    max_name_chars: usize,
}

impl Resolver {
    pub fn new(reader: Arc<dyn TagReader>, naming: &NamingSettings) -> Self {
        Self {
            reader,
            rewrite: naming.rewrite_filenames,
            max_name_chars: naming.max_name_chars,
        }
    }

    pub fn lofty(naming: &NamingSettings) -> Self {
        Self::new(Arc::new(LoftyTagReader), naming)
    }

    pub fn resolve(&self, path: &Path) -> Resolved {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !self.rewrite {
            return self.finish(&stem, ext, None, None);
        }

        match self.reader.read_tags(path) {
            Ok(tags) => match tagged_stem(&tags) {
                Some(tagged) => self.finish(&tagged, ext, tags.artist, None),
                None => {
                    let warning = Warning::MetadataUnavailable {
                        path: path.to_path_buf(),
                        detail: "artist or title tag missing".to_string(),
                    };
                    debug!(path = %path.display(), "no usable tags, naming by file");
                    self.finish(&stem, ext, tags.artist, Some(warning))
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "tag read failed, naming by file");
                let warning = Warning::MetadataUnavailable {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                };
                self.finish(&stem, ext, None, Some(warning))
            }
        }
    }

    fn finish(
        &self,
        stem: &str,
        ext: &str,
        artist: Option<String>,
        warning: Option<Warning>,
    ) -> Resolved {
        let file_name = normalize::file_name(stem, ext, self.max_name_chars);
        Resolved {
            identity: identity_key(&file_name),
            file_name,
            artist,
            warning,
        }
    }
}

fn tagged_stem(tags: &TrackTags) -> Option<String> {
    let artist = tags.artist.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let title = tags.title.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    match tags.album.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(album) => Some(format!("{artist} - {album} - {title}")),
        None => Some(format!("{artist} - {title}")),
    }
}
