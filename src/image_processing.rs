use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::path::Path;
use thiserror::Error;

/// Bounding box for uploads.
const MAX_WIDTH: u32 = 1280;
const MAX_HEIGHT: u32 = 1280;
/// Fixed JPEG re-encode quality.
const JPEG_QUALITY: u8 = 78;

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// A downscaled, re-encoded upload payload.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Bytes,
    /// Original name with the extension normalized to `.jpg`.
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

/// Shrink an image into the upload bounding box and re-encode it as JPEG.
///
/// The scale factor is uniform and capped at 1, so small images keep their
/// dimensions and only change container. Decoding accepts whatever the
/// enabled codecs handle (JPEG, PNG, WebP).
pub fn compress_for_upload(input: &[u8], filename: &str) -> Result<CompressedImage, CompressError> {
    let decoded = image::load_from_memory(input).map_err(CompressError::Decode)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let (target_w, target_h) = fit_dimensions(width, height, MAX_WIDTH, MAX_HEIGHT);
    let resized = if (target_w, target_h) == (width, height) {
        rgb
    } else {
        image::imageops::resize(&rgb, target_w, target_h, FilterType::Lanczos3)
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode(resized.as_raw(), target_w, target_h, image::ExtendedColorType::Rgb8)
        .map_err(CompressError::Encode)?;

    log::debug!(
        "compressed {}: {}x{} ({} bytes) -> {}x{} ({} bytes)",
        filename,
        width,
        height,
        input.len(),
        target_w,
        target_h,
        buf.len()
    );

    Ok(CompressedImage {
        bytes: Bytes::from(buf),
        filename: normalize_jpeg_name(filename),
        width: target_w,
        height: target_h,
    })
}

/// Uniform downscale into a bounding box. Never upscales; target
/// dimensions are rounded and kept at least 1.
fn fit_dimensions(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let scale = f64::min(
        1.0,
        f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64),
    );
    if scale >= 1.0 {
        return (width, height);
    }
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Swap whatever extension the input had for `.jpg`.
fn normalize_jpeg_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{}.jpg", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([180, 40, 90]),
        ));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_fit_dimensions_never_upscales() {
        assert_eq!(fit_dimensions(640, 480, 1280, 1280), (640, 480));
        assert_eq!(fit_dimensions(1280, 1280, 1280, 1280), (1280, 1280));
    }

    #[test]
    fn test_fit_dimensions_scales_uniformly() {
        assert_eq!(fit_dimensions(2560, 1280, 1280, 1280), (1280, 640));
        assert_eq!(fit_dimensions(1280, 2560, 1280, 1280), (640, 1280));
        // 1280/3000 rounds the short side to 853.
        assert_eq!(fit_dimensions(3000, 2000, 1280, 1280), (1280, 853));
    }

    #[test]
    fn test_large_image_lands_in_bounding_box_as_jpeg() {
        let compressed = compress_for_upload(&png_bytes(2000, 1000), "big.png").unwrap();
        assert_eq!((compressed.width, compressed.height), (1280, 640));
        assert_eq!(compressed.filename, "big.jpg");

        assert_eq!(image::guess_format(&compressed.bytes).unwrap(), image::ImageFormat::Jpeg);
        let reloaded = image::load_from_memory(&compressed.bytes).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (1280, 640));
    }

    #[test]
    fn test_small_image_keeps_dimensions() {
        let compressed = compress_for_upload(&png_bytes(100, 50), "small.png").unwrap();
        assert_eq!((compressed.width, compressed.height), (100, 50));
    }

    #[test]
    fn test_filename_normalization() {
        assert_eq!(normalize_jpeg_name("photo.webp"), "photo.jpg");
        assert_eq!(normalize_jpeg_name("photo"), "photo.jpg");
        assert_eq!(normalize_jpeg_name("archive.tar.gz"), "archive.tar.jpg");
        assert_eq!(normalize_jpeg_name(""), "image.jpg");
    }

    #[test]
    fn test_garbage_input_is_a_decode_error() {
        let err = compress_for_upload(b"not an image at all", "x.png").unwrap_err();
        assert!(matches!(err, CompressError::Decode(_)));
    }
}
