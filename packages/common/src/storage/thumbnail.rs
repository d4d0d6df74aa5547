use std::fs::OpenOptions;
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat, ImageReader};

use super::error::StorageError;
use super::naming::thumb_filename;

/// Edge length of generated thumbnails, in pixels.
pub const THUMBNAIL_SIZE: (u32, u32) = (75, 75);

/// Write a scaled and center-cropped thumbnail next to `path`.
///
/// Images that are neither greyscale nor RGB are converted to RGB first.
/// The thumbnail is opened create-exclusive: an existing file at the
/// thumbnail path is left alone and reported as [`StorageError::NameTaken`].
/// Blocking; call from `spawn_blocking` inside async code.
pub fn create_thumbnail(path: &Path) -> Result<PathBuf, StorageError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;

    let image = match image.color() {
        ColorType::L8 | ColorType::Rgb8 => image,
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    };

    let (width, height) = THUMBNAIL_SIZE;
    let fitted = image.resize_to_fill(width, height, FilterType::Lanczos3);

    let thumb_path = thumb_filename(path);
    let format = ImageFormat::from_path(&thumb_path)?;
    let mut encoded = Vec::new();
    fitted.write_to(&mut Cursor::new(&mut encoded), format)?;

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&thumb_path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(StorageError::NameTaken(thumb_path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(&encoded)?;
    Ok(thumb_path)
}
