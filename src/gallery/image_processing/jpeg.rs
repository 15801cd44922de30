use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use std::{fs::File, io::BufWriter, path::Path};

use crate::gallery::GalleryError;

/// Save image as baseline JPEG. Alpha, if any, is dropped.
pub fn save(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), GalleryError> {
    let rgb_image = image.to_rgb8();
    let output = BufWriter::new(File::create(path)?);

    let encoder = JpegEncoder::new_with_quality(output, quality);
    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(())
}
