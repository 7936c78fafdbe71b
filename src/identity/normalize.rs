//! Filesystem-safe name normalization.
//!
//! Source-side and destination-side resolution must produce byte-identical
//! names, so every rule here is a pure function of its input:
//!
//! 1. Characters illegal on FAT/NTFS (`<>:"/\|?*`) and control characters
//!    become [`SUBSTITUTE`].
//! 2. Whitespace runs collapse to one space; leading/trailing whitespace and
//!    trailing dots are dropped.
//! 3. The stem is cut to `max_chars` characters (never inside a code point),
//!    then step 2's trimming is applied again.
//! 4. The extension is kept, lowercased.
//!
//! The identity key is the resulting file name, lowercased.

pub const SUBSTITUTE: char = '_';

/// Stem used when nothing printable survives sanitizing.
pub const EMPTY_STEM: &str = "untitled";

const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;

        if c.is_control() || ILLEGAL.contains(&c) {
            out.push(SUBSTITUTE);
        } else {
            out.push(c);
        }
    }

    trim_name(&out).to_string()
}

fn trim_name(s: &str) -> &str {
    s.trim().trim_end_matches(['.', ' '])
}

pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Build the on-disk file name from a raw stem and extension.
pub fn file_name(stem: &str, ext: &str, max_chars: usize) -> String {
    let clean = sanitize(stem);
    let cut = trim_name(truncate_chars(&clean, max_chars));
    let stem = if cut.is_empty() { EMPTY_STEM } else { cut };

    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{ext}")
    }
}

pub fn identity_key(file_name: &str) -> String {
    file_name.to_lowercase()
}
