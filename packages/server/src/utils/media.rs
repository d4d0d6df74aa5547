use std::path::Path;

use crate::config::UploadConfig;

/// Public URL of a file stored below the upload or media root.
///
/// With `upload_prefix` configured the URL is that prefix followed by the
/// path relative to `upload_root`; otherwise `media_url` followed by the path
/// relative to `media_root`.
pub fn media_url(path: &Path, uploads: &UploadConfig) -> String {
    let (prefix, base) = match uploads.upload_prefix.as_deref() {
        Some(prefix) if !prefix.is_empty() => (prefix, uploads.upload_root.as_path()),
        _ => (uploads.media_url.as_str(), uploads.media_root.as_path()),
    };
    collapse_slashes(&format!("{prefix}/{}", relative_url_path(path, base)))
}

/// URL under which the project file server returns `file_name` from the
/// public folder of project `short_name`.
pub fn project_url(uploads: &UploadConfig, short_name: &str, file_name: &str) -> String {
    let file_path = format!("{}/{}", uploads.public_folder_name, file_name).replace('\\', "/");
    collapse_slashes(&format!(
        "{}/{short_name}/serve/{file_path}/",
        uploads.site_prefix
    ))
}

/// `path` relative to `base`, joined with forward slashes.
///
/// Paths outside `base` are returned whole, which still produces a usable
/// (if unserved) URL.
fn relative_url_path(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Replace runs of `/` in the path portion of `url` with a single slash.
///
/// The `//` after a scheme is left alone.
pub fn collapse_slashes(url: &str) -> String {
    let (head, path) = match url.find("://") {
        Some(idx) => {
            let after_scheme = idx + 3;
            match url[after_scheme..].find('/') {
                Some(slash) => url.split_at(after_scheme + slash),
                None => return url.to_string(),
            }
        }
        None => ("", url),
    };

    let mut out = String::with_capacity(url.len());
    out.push_str(head);
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }
    out
}
