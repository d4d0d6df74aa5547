/// Reasons an upload name cannot be stored on disk.
#[derive(Debug, PartialEq, Eq)]
pub enum UploadNameError {
    Empty,
    /// Contains `/`, `\` or is `..`, so it would leave the target directory.
    Traversal,
    /// Contains NUL or other ASCII control characters.
    ControlCharacter,
    /// Starts with a dot.
    Hidden,
    TooLong,
}

impl UploadNameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::Traversal => "Filename must not contain path components",
            Self::ControlCharacter => "Filename must not contain control characters",
            Self::Hidden => "Filename must not start with '.'",
            Self::TooLong => "Filename exceeds 200 bytes",
        }
    }
}

/// Maximum byte length of an incoming name; leaves room for collision
/// underscores and the thumbnail suffix under the usual 255-byte limit.
const MAX_UPLOAD_NAME: usize = 200;

/// Validate the client-supplied name of an uploaded file.
///
/// Browsers on some platforms send a full path, so only the last component
/// is kept before checking.
pub fn sanitize_upload_name(raw: &str) -> Result<&str, UploadNameError> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim();

    if name.is_empty() {
        return Err(UploadNameError::Empty);
    }
    if name == ".." || name == "." {
        return Err(UploadNameError::Traversal);
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err(UploadNameError::ControlCharacter);
    }
    if name.starts_with('.') {
        return Err(UploadNameError::Hidden);
    }
    if name.len() > MAX_UPLOAD_NAME {
        return Err(UploadNameError::TooLong);
    }
    Ok(name)
}

/// Whether `segment` is safe to use as a single directory name, such as a
/// username or a challenge short name.
pub fn is_safe_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with(['.', '-'])
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}
