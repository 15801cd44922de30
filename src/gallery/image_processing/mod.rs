// Image processing module - thumbnail generation for uploaded images
mod jpeg;
mod resize;

use std::path::Path;
use tracing::debug;

use crate::gallery::GalleryError;

pub use resize::{ThumbnailSize, fit_within, flatten_onto_white};

/// Decode `source`, flatten any transparency onto white, shrink it to fit
/// inside `size` and write it to `destination` as JPEG.
///
/// Returns the dimensions of the written thumbnail.
pub fn create_thumbnail(
    source: &Path,
    destination: &Path,
    size: ThumbnailSize,
    quality: u8,
) -> Result<(u32, u32), GalleryError> {
    let reader = image::ImageReader::open(source)?.with_guessed_format()?;
    debug!(
        "Opening image file: {:?}, detected format: {:?}",
        source,
        reader.format()
    );
    let img = reader.decode()?;

    let flattened = flatten_onto_white(img);
    let resized = fit_within(&flattened, size);

    jpeg::save(&resized, destination, quality)?;
    Ok((resized.width(), resized.height()))
}
