use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read an M3U/M3U8 playlist and return its entries resolved against the
/// playlist's own directory, in file order.
pub fn read_playlist(path: &Path) -> Result<Vec<PathBuf>> {
    let bytes = fs::read(path).map_err(|source| Error::Playlist {
        path: path.to_path_buf(),
        source,
    })?;

    let base = fs::canonicalize(path)
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .or_else(|| path.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    Ok(parse_m3u(&decode(&bytes), &base))
}

/// Decode playlist bytes: UTF-8 (BOM optional), else Latin-1.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Split playlist text into entries. `#` lines (`#EXTM3U`, `#EXTINF`, ...)
/// and blank lines are skipped; relative entries are joined onto `base`.
pub fn parse_m3u(text: &str, base: &Path) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| base.join(line))
        .collect()
}
