use image::{DynamicImage, Rgb, RgbImage, imageops::FilterType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Composite images that carry alpha over an opaque white background.
/// Palette images are expanded to RGBA by the decoder and land here too.
pub fn flatten_onto_white(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }

    let rgba = img.to_rgba8();
    let mut background = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        let blend = |channel: u8| -> u8 {
            ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        background.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }

    DynamicImage::ImageRgb8(background)
}

/// Resize preserving aspect ratio so the image fits inside `size`.
/// Images already inside the box are returned unchanged.
pub fn fit_within(img: &DynamicImage, size: ThumbnailSize) -> DynamicImage {
    let (orig_width, orig_height) = (img.width(), img.height());

    // Don't upscale - clamp the box to the original dimensions
    let final_width = size.width.min(orig_width).max(1);
    let final_height = size.height.min(orig_height).max(1);

    if final_width != orig_width || final_height != orig_height {
        img.resize(final_width, final_height, FilterType::Lanczos3)
    } else {
        img.clone()
    }
}
