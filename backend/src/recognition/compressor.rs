use super::RecognitionError;
use super::normalizer::{NormalizedImage, encode_jpeg};

pub const TARGET_BYTES: usize = 3 * 1024 * 1024 + 512 * 1024;
pub const TRANSPORT_CEILING_BYTES: usize = 4 * 1024 * 1024;

/// Bounds of the descending quality search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    pub start_quality: u8,
    pub floor_quality: u8,
    pub step: u8,
    pub target_bytes: usize,
    pub transport_ceiling: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            start_quality: 90,
            floor_quality: 50,
            step: 5,
            target_bytes: TARGET_BYTES,
            transport_ceiling: TRANSPORT_CEILING_BYTES,
        }
    }
}

impl CompressionConfig {
    /// Upper bound on encodes a single search performs.
    pub fn max_attempts(&self) -> u32 {
        if self.start_quality < self.floor_quality {
            return 0;
        }
        (self.start_quality - self.floor_quality) as u32 / self.step.max(1) as u32 + 1
    }
}

#[derive(Debug, Clone)]
pub struct CompressedImage {
    bytes: Vec<u8>,
    quality: u8,
    attempts: u32,
}

impl CompressedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Quality of the returned encoding.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Number of re-encodes performed; zero on the fast path.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn base64_len(&self) -> usize {
        base64_len(self.bytes.len())
    }
}

pub fn base64_len(raw_len: usize) -> usize {
    raw_len.div_ceil(3) * 4
}

#[derive(Debug, Clone, Default)]
pub struct SizeCompressor {
    config: CompressionConfig,
}

impl SizeCompressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    fn fits(&self, len: usize, budget_bytes: usize) -> bool {
        len <= budget_bytes && base64_len(len) <= self.config.transport_ceiling
    }

    pub fn compress(&self, img: NormalizedImage) -> Result<CompressedImage, RecognitionError> {
        self.compress_to_budget(img, self.config.target_bytes)
    }

    /// The first quality from the top that fits wins; the search does not
    /// look for the best quality under budget. When even the floor quality
    /// is too big, the floor encoding is returned anyway.
    pub fn compress_to_budget(
        &self,
        img: NormalizedImage,
        budget_bytes: usize,
    ) -> Result<CompressedImage, RecognitionError> {
        if self.fits(img.len(), budget_bytes) {
            let quality = img.quality();
            return Ok(CompressedImage {
                bytes: img.into_bytes(),
                quality,
                attempts: 0,
            });
        }

        let step = self.config.step.max(1);
        let mut quality = self.config.start_quality;
        let mut attempts = 0;
        let mut last: Option<(Vec<u8>, u8)> = None;

        while quality >= self.config.floor_quality {
            let encoded = encode_jpeg(img.pixels(), quality)?;
            attempts += 1;
            if self.fits(encoded.len(), budget_bytes) {
                return Ok(CompressedImage {
                    bytes: encoded,
                    quality,
                    attempts,
                });
            }
            last = Some((encoded, quality));
            match quality.checked_sub(step) {
                Some(next) => quality = next,
                None => break,
            }
        }

        match last {
            Some((bytes, quality)) if bytes.len() <= img.len() => Ok(CompressedImage {
                bytes,
                quality,
                attempts,
            }),
            // No re-encode came out smaller than the normalized input.
            _ => {
                let quality = img.quality();
                Ok(CompressedImage {
                    bytes: img.into_bytes(),
                    quality,
                    attempts,
                })
            }
        }
    }
}
