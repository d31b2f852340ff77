use crate::config::OcrConfig;
use crate::error::{LexError, Result};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader};

/// Decode image bytes into the grayscale raster the ensemble works on
///
/// Applies the following transformations:
/// 1. Validates image dimensions (min check)
/// 2. Resizes large images while maintaining aspect ratio
/// 3. Flattens any alpha channel onto a white background
/// 4. Converts to 8-bit grayscale
///
/// No thresholding happens here: binarization is done per variant.
pub fn load_grayscale(bytes: &[u8], config: &OcrConfig) -> Result<GrayImage> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LexError::Image(format!("Failed to read image: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| LexError::Image(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(LexError::Validation(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let img = resize_if_needed(img, config.max_image_dimension);
    Ok(flatten_to_gray(img))
}

/// Encode a grayscale raster as PNG bytes, the form leptess accepts
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| LexError::Image(format!("Failed to encode image: {e}")))?;
    Ok(output)
}

/// Resize image if it exceeds maximum dimension while maintaining aspect ratio
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = (width as f32 * ratio) as u32;
    let new_height = (height as f32 * ratio) as u32;

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

/// Convert to grayscale with Rec.601 weights (the usual "L" conversion),
/// compositing transparent pixels over white so that cut-outs from
/// screenshots don't turn into black blobs
fn flatten_to_gray(img: DynamicImage) -> GrayImage {
    if !img.color().has_color() && !img.color().has_alpha() {
        return img.to_luma8();
    }

    let rgba = img.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let luma = rec601_luma(r, g, b) as f32;
        let alpha = a as f32 / 255.0;
        let blended = luma * alpha + 255.0 * (1.0 - alpha);
        image::Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Fixed-point `0.299 R + 0.587 G + 0.114 B`.
fn rec601_luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000;
    (weighted >> 16) as u8
}
