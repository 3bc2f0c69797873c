use std::path::Path;

use image::{ImageReader, RgbImage};
use tracing::debug;

use crate::error::ImageUnreadable;

/// Extensions accepted for uploaded source photos
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Check whether a file name carries one of the accepted image extensions
pub fn is_supported_image(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Decode a source image into an RGB raster.
///
/// The format is sniffed from the file contents, so the extension only
/// matters to callers filtering uploads with [`is_supported_image`].
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbImage, ImageUnreadable> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(ImageUnreadable::NotFound(path.to_path_buf()));
    }

    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| ImageUnreadable::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let img = reader.decode().map_err(|source| ImageUnreadable::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Image loaded: {}x{} from {}", img.width(), img.height(), path.display());

    Ok(img.to_rgb8())
}
