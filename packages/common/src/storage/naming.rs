use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

/// Suffix appended to the stem of generated thumbnails.
pub const THUMB_SUFFIX: &str = "_thumb";

/// Split a file name into `(stem, extension)`; the extension keeps its dot.
///
/// Leading dots never start an extension, so `.bashrc` has no extension and
/// `archive.tar.gz` splits into `archive.tar` and `.gz`.
pub fn split_ext(file_name: &str) -> (&str, &str) {
    let lead = file_name.len() - file_name.trim_start_matches('.').len();
    match file_name[lead..].rfind('.') {
        Some(idx) => file_name.split_at(lead + idx),
        None => (file_name, ""),
    }
}

/// Thumbnail name for a file: `_thumb` inserted before the extension.
pub fn thumb_filename(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = split_ext(&name);
    path.with_file_name(format!("{stem}{THUMB_SUFFIX}{ext}"))
}

/// Whether the file at `path` is a generated thumbnail.
pub fn is_thumbnail(path: &Path) -> bool {
    path.file_name()
        .map(|n| split_ext(&n.to_string_lossy()).0.ends_with(THUMB_SUFFIX))
        .unwrap_or(false)
}

/// Next candidate after a name collision: one more underscore on the stem.
pub fn next_candidate(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = split_ext(&name);
    path.with_file_name(format!("{stem}_{ext}"))
}

/// Date partition for uploads: `YYYY/MM/DD`.
pub fn date_path(date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!("{:02}", date.day()))
}
