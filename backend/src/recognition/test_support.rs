//! In-memory images and a canned transport for unit tests.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::cell::RefCell;
use std::io::Cursor;
use std::time::Duration;

use super::transport::{HttpTransport, TransportError, TransportResponse};

/// Deterministic noise; compresses poorly, which keeps encoded sizes
/// predictable enough for size-budget tests.
pub fn noisy_image(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        };
        Rgb([next(), next(), next()])
    })
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    DynamicImage::ImageRgb8(img.clone())
        .write_with_encoder(encoder)
        .unwrap();
    out.into_inner()
}

pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub form: Vec<(String, String)>,
    pub timeout: Duration,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Answers form posts with canned bodies picked by URL prefix. A route
/// registered without a body behaves like a request that hit its deadline.
#[derive(Default)]
pub struct StubTransport {
    routes: Vec<(String, Option<TransportResponse>)>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, url_prefix: &str, body: &str) -> Self {
        self.routes.push((
            url_prefix.to_string(),
            Some(TransportResponse {
                status: 200,
                body: body.to_string(),
            }),
        ));
        self
    }

    pub fn time_out(mut self, url_prefix: &str) -> Self {
        self.routes.push((url_prefix.to_string(), None));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }
}

impl HttpTransport for &StubTransport {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.borrow_mut().push(RecordedRequest {
            url: url.to_string(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timeout,
        });
        match self.routes.iter().find(|(prefix, _)| url.starts_with(prefix.as_str())) {
            Some((_, Some(response))) => Ok(response.clone()),
            Some((_, None)) => Err(TransportError::Timeout(timeout)),
            None => Err(TransportError::Request(format!("connection refused: {}", url))),
        }
    }
}
