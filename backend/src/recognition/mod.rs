//! Image normalization and fish classification.
//!
//! An upload flows through five stages, each of which either transforms the
//! image or makes a single remote call:
//!
//! 1. [`ImageValidator`] checks size bounds and that the bytes decode as jpeg or png
//! 2. [`FormatNormalizer`] re-encodes to JPEG, dropping metadata
//! 3. [`SizeCompressor`] lowers JPEG quality until the payload fits the budget
//! 4. [`ClassifierClient`] obtains a token and asks the provider for labels
//! 5. [`ResultSelector`] picks the fish label and attaches a description
//!
//! The first failing stage ends the run with its own [`RecognitionError`].

pub mod catalog;
pub mod classifier;
pub mod compressor;
pub mod credentials;
pub mod error;
pub mod normalizer;
pub mod selector;
pub mod transport;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{SpeciesCatalog, SpeciesEntry};
pub use classifier::{CandidateLabel, Classification, ClassifierClient};
pub use compressor::{CompressedImage, CompressionConfig, SizeCompressor};
pub use credentials::{AccessCredential, CredentialProvider, OAuthCredentialProvider};
pub use error::RecognitionError;
pub use normalizer::{FormatNormalizer, NormalizedImage};
pub use selector::ResultSelector;
pub use transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse};
pub use validator::{ImageKind, ImageValidator, ValidatedImage, ValidationLimits};

use shared::ClassificationResult;
use uuid::Uuid;

/// The full upload-to-answer pipeline. Holds no per-request state, so one
/// instance serves all concurrent requests.
pub struct FishRecognizer<T, C> {
    validator: ImageValidator,
    normalizer: FormatNormalizer,
    compressor: SizeCompressor,
    client: ClassifierClient<T, C>,
    selector: ResultSelector,
}

impl<T: HttpTransport, C: CredentialProvider> FishRecognizer<T, C> {
    pub fn new(
        validator: ImageValidator,
        normalizer: FormatNormalizer,
        compressor: SizeCompressor,
        client: ClassifierClient<T, C>,
        selector: ResultSelector,
    ) -> Self {
        Self {
            validator,
            normalizer,
            compressor,
            client,
            selector,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.validator.limits().max_bytes
    }

    pub async fn recognize(&self, raw: &[u8]) -> Result<ClassificationResult, RecognitionError> {
        let request_id = Uuid::new_v4();
        let result = self.run(request_id, raw).await;
        match &result {
            Ok(outcome) => log::info!(
                "[{}] Recognized {} (score {:.4})",
                request_id,
                outcome.name,
                outcome.score
            ),
            Err(e) if e.is_client_error() => log::warn!("[{}] Rejected upload: {}", request_id, e),
            Err(e) => log::error!("[{}] Recognition failed: {}", request_id, e),
        }
        result
    }

    async fn run(
        &self,
        request_id: Uuid,
        raw: &[u8],
    ) -> Result<ClassificationResult, RecognitionError> {
        log::info!("[{}] Received image of {} bytes", request_id, raw.len());

        let validated = self.validator.validate(raw)?;
        let kind = validated.kind();
        let normalized = self.normalizer.normalize(validated)?;
        log::debug!(
            "[{}] Normalized {} ({} bytes) to jpeg ({} bytes) at quality {}",
            request_id,
            kind,
            raw.len(),
            normalized.len(),
            normalized.quality()
        );

        let config = self.compressor.config();
        let compressed = self.compressor.compress(normalized)?;
        log::info!(
            "[{}] Payload {} bytes (base64 {}) at quality {} after {} compression attempts",
            request_id,
            compressed.len(),
            compressed.base64_len(),
            compressed.quality(),
            compressed.attempts()
        );
        if compressed.len() > config.target_bytes
            || compressed.base64_len() > config.transport_ceiling
        {
            log::warn!(
                "[{}] Payload still over budget ({} > {} bytes or base64 {} > {})",
                request_id,
                compressed.len(),
                config.target_bytes,
                compressed.base64_len(),
                config.transport_ceiling
            );
        }

        let answer = self.client.classify(&compressed).await?;
        log::info!(
            "[{}] Classifier returned {} candidate labels (log_id {})",
            request_id,
            answer.labels.len(),
            answer.log_id.as_deref().unwrap_or("-")
        );
        self.selector.select(&answer.labels)
    }
}
