use std::path::{Path, PathBuf};

use crate::config::LayoutSettings;
use crate::error::{Error, Result};

const PLACEHOLDER: &str = "%d";

/// Folder capacity policy and naming scheme for one destination root.
///
/// Folder index 0 is named with number 1. With `tracks_per_folder == 0`
/// there is a single unbounded folder: the root itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    root: PathBuf,
    tracks_per_folder: usize,
    max_folders: usize,
    prefix: String,
    suffix: String,
}

impl FolderLayout {
    pub fn new(root: impl Into<PathBuf>, settings: &LayoutSettings) -> Result<Self> {
        let format = &settings.folder_name_format;
        let (prefix, suffix) = format
            .split_once(PLACEHOLDER)
            .filter(|(_, rest)| !rest.contains(PLACEHOLDER))
            .ok_or_else(|| {
                Error::config(format!("folder name format {format:?} needs exactly one %d"))
            })?;

        Ok(Self {
            root: root.into(),
            tracks_per_folder: settings.tracks_per_folder,
            max_folders: settings.max_folders,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_bounded(&self) -> bool {
        self.tracks_per_folder > 0
    }

    /// Tracks allowed per folder, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.is_bounded().then_some(self.tracks_per_folder)
    }

    pub fn max_folders(&self) -> usize {
        if self.is_bounded() { self.max_folders } else { 1 }
    }

    pub fn folder_name(&self, index: usize) -> String {
        format!("{}{}{}", self.prefix, index + 1, self.suffix)
    }

    pub fn folder_path(&self, index: usize) -> PathBuf {
        if self.is_bounded() {
            self.root.join(self.folder_name(index))
        } else {
            self.root.clone()
        }
    }

    /// Map a directory name back to its folder index. Only the canonical
    /// spelling matches, so `Folder 01` is not folder 0.
    pub fn parse_folder_name(&self, name: &str) -> Option<usize> {
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number: usize = digits.parse().ok()?;
        let index = number.checked_sub(1)?;
        (self.folder_name(index) == name).then_some(index)
    }
}
