use std::path::Path;

use lofty::prelude::*;
use thiserror::Error;

/// The three tag fields a track's identity is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
}

impl TrackTags {
    #[cfg(test)]
    pub fn new(artist: &str, album: Option<&str>, title: &str) -> Self {
        Self {
            artist: Some(artist.to_string()),
            album: album.map(str::to_string),
            title: Some(title.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum TagError {
    #[error("unsupported audio format")]
    UnsupportedFormat,

    #[error(transparent)]
    Lofty(#[from] lofty::error::LoftyError),
}

/// Capability to read artist, album and title from an audio file.
///
/// The resolver only depends on this trait so tests can swap in canned tags.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TrackTags, TagError>;
}

/// Container formats the tag reader understands, picked by extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(Self::Mp3),
            "m4a" | "mp4" | "aac" => Some(Self::M4a),
            "wav" | "wave" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "ogg" | "oga" | "opus" => Some(Self::Ogg),
            _ => None,
        }
    }
}

/// Tag reader backed by lofty, which sniffs the container header itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TrackTags, TagError> {
        if AudioFormat::from_path(path).is_none() {
            return Err(TagError::UnsupportedFormat);
        }

        let tagged = lofty::read_from_path(path)?;
        let mut tags = TrackTags::default();

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            tags.artist = non_blank(tag.artist().as_deref());
            tags.album = non_blank(tag.album().as_deref());
            tags.title = non_blank(tag.title().as_deref());
        }

        Ok(tags)
    }
}

fn non_blank(v: Option<&str>) -> Option<String> {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
