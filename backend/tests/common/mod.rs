#![allow(dead_code)]

use backend::recognition::classifier::DEFAULT_CLASSIFY_URL;
use backend::recognition::credentials::DEFAULT_TOKEN_URL;
use backend::recognition::{
    ClassifierClient, FishRecognizer, FormatNormalizer, HttpTransport, ImageValidator,
    OAuthCredentialProvider, ResultSelector, SizeCompressor, SpeciesCatalog, TransportError,
    TransportResponse,
};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TOKEN_OK: &str = r#"{"access_token":"24.integration","expires_in":2592000}"#;

pub type StubRecognizer = FishRecognizer<ProviderStub, OAuthCredentialProvider<ProviderStub>>;

/// Provider double shared between the credential and classification calls.
#[derive(Clone)]
pub struct ProviderStub {
    token_body: Arc<String>,
    classify_body: Arc<String>,
    pub calls: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
}

impl ProviderStub {
    pub fn new(token_body: &str, classify_body: &str) -> Self {
        Self {
            token_body: Arc::new(token_body.to_string()),
            classify_body: Arc::new(classify_body.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl HttpTransport for ProviderStub {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push((
            url.to_string(),
            form.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        let body = if url.starts_with(DEFAULT_TOKEN_URL) {
            self.token_body.as_str()
        } else if url.starts_with(DEFAULT_CLASSIFY_URL) {
            self.classify_body.as_str()
        } else {
            return Err(TransportError::Request(format!("unexpected url {}", url)));
        };
        Ok(TransportResponse {
            status: 200,
            body: body.to_string(),
        })
    }
}

pub fn recognizer(stub: &ProviderStub) -> StubRecognizer {
    let credentials = OAuthCredentialProvider::new(stub.clone(), "key".into(), "secret".into());
    FishRecognizer::new(
        ImageValidator::default(),
        FormatNormalizer::default(),
        SizeCompressor::default(),
        ClassifierClient::new(stub.clone(), credentials),
        ResultSelector::new(Arc::new(SpeciesCatalog::builtin())),
    )
}

/// A carp-coloured photo stand-in: orange body over murky water, with
/// per-pixel noise so the JPEG stays a realistic size.
pub fn carp_photo(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x9E37_79B9;
    RgbImage::from_fn(width, height, |x, y| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let jitter = (state & 0x3F) as u8;
        let dx = x as f32 / width as f32 - 0.5;
        let dy = y as f32 / height as f32 - 0.5;
        if (dx * dx) / 0.12 + (dy * dy) / 0.03 < 1.0 {
            Rgb([200u8.saturating_add(jitter / 2), 110 + jitter, 40 + jitter])
        } else {
            Rgb([20 + jitter, 70 + jitter, 60 + jitter])
        }
    })
}

pub fn jpeg_bytes(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    DynamicImage::ImageRgb8(img.clone())
        .write_with_encoder(encoder)
        .unwrap();
    out.into_inner()
}
