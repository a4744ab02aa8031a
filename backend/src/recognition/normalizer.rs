use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use std::io::Cursor;

use super::RecognitionError;
use super::validator::ValidatedImage;

pub const NORMALIZE_QUALITY: u8 = 95;

/// JPEG bytes re-encoded from decoded pixels, together with those pixels so
/// later stages can re-encode without decoding again.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    pixels: DynamicImage,
    quality: u8,
}

impl NormalizedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FormatNormalizer {
    quality: u8,
}

impl Default for FormatNormalizer {
    fn default() -> Self {
        Self {
            quality: NORMALIZE_QUALITY,
        }
    }
}

impl FormatNormalizer {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Decodes and re-encodes as JPEG. Going through the pixel buffer both
    /// converts PNG input and drops EXIF and other non-pixel segments, so
    /// JPEG input is re-encoded too.
    pub fn normalize(&self, img: ValidatedImage<'_>) -> Result<NormalizedImage, RecognitionError> {
        let decoded = image::load_from_memory_with_format(img.bytes(), img.kind().image_format())
            .map_err(|e| RecognitionError::DecodeError(e.to_string()))?;

        // JPEG has no alpha channel; flatten once here.
        let pixels = DynamicImage::ImageRgb8(decoded.to_rgb8());
        let bytes = encode_jpeg(&pixels, self.quality)?;

        Ok(NormalizedImage {
            bytes,
            pixels,
            quality: self.quality,
        })
    }
}

pub(crate) fn encode_jpeg(pixels: &DynamicImage, quality: u8) -> Result<Vec<u8>, RecognitionError> {
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    pixels
        .write_with_encoder(encoder)
        .map_err(|e| RecognitionError::EncodeError(e.to_string()))?;
    Ok(out.into_inner())
}
