use image::ImageFormat;
use std::fmt;

use super::RecognitionError;

pub const MIN_IMAGE_BYTES: usize = 1024;
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Raster formats accepted from uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            _ => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub min_bytes: usize,
    pub max_bytes: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_bytes: MIN_IMAGE_BYTES,
            max_bytes: MAX_IMAGE_BYTES,
        }
    }
}

/// Upload bytes that passed the size and format checks.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedImage<'a> {
    bytes: &'a [u8],
    kind: ImageKind,
}

impl<'a> ValidatedImage<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageValidator {
    limits: ValidationLimits,
}

impl ImageValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Size checks run before any decode so oversized uploads never reach
    /// the codec.
    pub fn validate<'a>(&self, raw: &'a [u8]) -> Result<ValidatedImage<'a>, RecognitionError> {
        if raw.len() < self.limits.min_bytes {
            return Err(RecognitionError::TooSmall {
                actual: raw.len(),
                min: self.limits.min_bytes,
            });
        }
        if raw.len() > self.limits.max_bytes {
            return Err(RecognitionError::TooLarge {
                actual: raw.len(),
                max: self.limits.max_bytes,
            });
        }

        let format = image::guess_format(raw)
            .map_err(|e| RecognitionError::UnsupportedFormat(format!("无效的图片格式: {}", e)))?;
        let kind = ImageKind::from_format(format).ok_or_else(|| {
            RecognitionError::UnsupportedFormat(format!("{:?}", format).to_lowercase())
        })?;

        image::load_from_memory_with_format(raw, format)
            .map_err(|e| RecognitionError::UnsupportedFormat(format!("无效的图片格式: {}", e)))?;

        Ok(ValidatedImage { bytes: raw, kind })
    }
}
