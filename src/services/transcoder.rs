use crate::services::sniffer::{DecodeFormat, Sniffed};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Extension given to every transcoded object
pub const NORMALIZED_EXTENSION: &str = ".webp";

/// What to do with an upload once its type is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Decode with the given format and re-encode as WebP
    Transcode(DecodeFormat),
    /// Store the original bytes under the original extension
    Verbatim,
}

/// Images other than WebP are transcoded; everything else is stored as-is.
pub fn plan(sniffed: &Sniffed) -> Plan {
    if sniffed.is_image() && !sniffed.is_normalized() {
        Plan::Transcode(sniffed.format())
    } else {
        Plan::Verbatim
    }
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Unsupported image format")]
    Unsupported,

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to convert image: {0}")]
    Encode(String),
}

impl TranscodeError {
    /// Decoding problems mean the upload is kept verbatim rather than rejected.
    pub fn is_fallback(&self) -> bool {
        matches!(self, TranscodeError::Unsupported | TranscodeError::Decode(_))
    }
}

/// Decodes `data` as `format` and re-encodes it as lossy WebP.
///
/// CPU bound; callers on the async runtime should run it on the blocking pool.
pub fn transcode(
    data: &[u8],
    format: DecodeFormat,
    quality: f32,
) -> Result<Vec<u8>, TranscodeError> {
    let image_format = match format {
        DecodeFormat::Jpeg => ImageFormat::Jpeg,
        DecodeFormat::Png => ImageFormat::Png,
        // First frame only for animations
        DecodeFormat::Gif => ImageFormat::Gif,
        DecodeFormat::Other => return Err(TranscodeError::Unsupported),
    };

    let decoded = image::load_from_memory_with_format(data, image_format)?;
    encode_webp(&decoded, quality)
}

/// Encodes an image as lossy WebP at `quality` (0-100).
pub fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, TranscodeError> {
    // libwebp only takes 8-bit RGB(A), so everything is flattened to one of the two
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, quality)
    } else {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, quality)
    };

    encoded
        .map(|memory| memory.to_vec())
        .map_err(|e| TranscodeError::Encode(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn sample_rgb() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(10, 10, |x, y| {
            Rgb([(x * 25) as u8, (y * 25) as u8, 128])
        }))
    }

    fn encode_as(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, format).unwrap();
        cursor.into_inner()
    }

    fn assert_webp_10x10(bytes: &[u8]) {
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::WebP).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 10));
    }

    #[test]
    fn test_plan() {
        let png = Sniffed::classify(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(plan(&png), Plan::Transcode(DecodeFormat::Png));

        let webp = Sniffed::classify(b"RIFF\x24\x00\x00\x00WEBPVP8 ");
        assert_eq!(plan(&webp), Plan::Verbatim);

        let text = Sniffed::classify(b"just some notes");
        assert_eq!(plan(&text), Plan::Verbatim);

        // Images without a decoder still go through the transcode attempt
        let bmp = Sniffed::classify(b"BM\x3a\x00\x00\x00\x00\x00\x00\x00\x36\x00\x00\x00");
        assert_eq!(plan(&bmp), Plan::Transcode(DecodeFormat::Other));
    }

    #[test]
    fn test_transcode_png() {
        let png = encode_as(&sample_rgb(), ImageFormat::Png);
        let webp = transcode(&png, DecodeFormat::Png, 80.0).unwrap();
        assert_webp_10x10(&webp);
    }

    #[test]
    fn test_transcode_jpeg() {
        let jpeg = encode_as(&sample_rgb(), ImageFormat::Jpeg);
        let webp = transcode(&jpeg, DecodeFormat::Jpeg, 80.0).unwrap();
        assert_webp_10x10(&webp);
    }

    #[test]
    fn test_transcode_gif() {
        let gif = encode_as(&sample_rgb(), ImageFormat::Gif);
        let webp = transcode(&gif, DecodeFormat::Gif, 80.0).unwrap();
        assert_webp_10x10(&webp);
    }

    #[test]
    fn test_transcode_keeps_alpha_images_encodable() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 100])));
        let png = encode_as(&img, ImageFormat::Png);
        let webp = transcode(&png, DecodeFormat::Png, 80.0).unwrap();
        assert_webp_10x10(&webp);
    }

    #[test]
    fn test_corrupt_image_falls_back() {
        let mut png = encode_as(&sample_rgb(), ImageFormat::Png);
        png.truncate(20);
        let err = transcode(&png, DecodeFormat::Png, 80.0).unwrap_err();
        assert!(matches!(err, TranscodeError::Decode(_)));
        assert!(err.is_fallback());
    }

    #[test]
    fn test_unsupported_format_falls_back() {
        let err = transcode(b"BM....", DecodeFormat::Other, 80.0).unwrap_err();
        assert!(matches!(err, TranscodeError::Unsupported));
        assert!(err.is_fallback());
        assert!(!TranscodeError::Encode("boom".into()).is_fallback());
    }
}
