//! On-disk naming.
//!
//! Every artifact of a download is derived from one sanitized base name:
//!
//! | artifact         | name                              |
//! |------------------|-----------------------------------|
//! | merged output    | `<title>.<ext>`                   |
//! | part             | `<title>[<index>].<part ext>`     |
//! | part in progress | `<title>[<index>].<part ext>.download` |
//! | concat list      | `<title>.txt`                     |
//!
//! The `.download` suffix is the only marker of an incomplete part.

use std::path::{Path, PathBuf};

/// Suffix of a part that is still being written.
pub const TEMP_SUFFIX: &str = "download";

/// Longest base name, in bytes, before the index and extension are added.
const MAX_BASE_NAME_BYTES: usize = 200;

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make `title` usable as a file name on every platform.
///
/// Control and reserved characters become `_` (runs collapse to one),
/// surrounding spaces and dots are trimmed, reserved Windows device names
/// get a `_` prefix, and the result is capped at 200 bytes.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_control() || INVALID_CHARS.contains(&c) {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let mut name = truncate_on_char_boundary(out.trim_matches([' ', '.']), MAX_BASE_NAME_BYTES)
        .trim_end_matches([' ', '.'])
        .to_string();
    if name.is_empty() {
        return "unnamed".to_string();
    }

    let stem = name.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if WINDOWS_RESERVED_NAMES.contains(&stem.as_str()) {
        name.insert(0, '_');
    }
    name
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Paths of every artifact belonging to one media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
    base: String,
}

impl OutputLayout {
    /// `name` is sanitized before use.
    pub fn new(dir: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            dir: dir.into(),
            base: sanitize_filename(name),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_name(&self) -> &str {
        &self.base
    }

    /// `<dir>/<title>` without extension.
    pub fn base_path(&self) -> PathBuf {
        self.dir.join(&self.base)
    }

    /// `<dir>/<title>[<index>]` without extension.
    pub fn part_base(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}[{index}]", self.base))
    }

    pub fn merged(&self, ext: &str) -> PathBuf {
        with_ext(&self.base_path(), ext)
    }

    pub fn part(&self, index: usize, ext: &str) -> PathBuf {
        with_ext(&self.part_base(index), ext)
    }

    pub fn concat_list(&self) -> PathBuf {
        with_ext(&self.base_path(), "txt")
    }
}

/// Append `.ext` to `base`. Unlike `Path::with_extension` this never
/// replaces a dot that is part of the title.
pub fn with_ext(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    if !ext.is_empty() {
        name.push(".");
        name.push(ext);
    }
    PathBuf::from(name)
}

/// `<path>.download`
pub fn temp_path(final_path: &Path) -> PathBuf {
    with_ext(final_path, TEMP_SUFFIX)
}
