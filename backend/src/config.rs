use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::recognition::classifier::{DEFAULT_CLASSIFY_TIMEOUT, DEFAULT_CLASSIFY_URL};
use crate::recognition::credentials::{DEFAULT_TOKEN_TIMEOUT, DEFAULT_TOKEN_URL};
use crate::recognition::{
    ClassifierClient, CompressionConfig, FishRecognizer, FormatNormalizer, ImageValidator,
    OAuthCredentialProvider, ReqwestTransport, ResultSelector, SizeCompressor, SpeciesCatalog,
    ValidationLimits,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type LiveRecognizer =
    FishRecognizer<ReqwestTransport, OAuthCredentialProvider<ReqwestTransport>>;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub secret_key: String,
    pub token_url: String,
    pub classify_url: String,
    pub token_timeout: Duration,
    pub classify_timeout: Duration,
    pub catalog_path: Option<PathBuf>,
    pub limits: ValidationLimits,
    pub compression: CompressionConfig,
}

impl AppConfig {
    /// Reads the process environment (after `.env`, if present, was loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ConfigError::Invalid(format!("PORT must be a port number, got {:?}", raw))
            })?,
            None => 8080,
        };

        let seconds = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            match non_empty(key) {
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                    _ => Err(ConfigError::Invalid(format!(
                        "{} must be a positive number of seconds, got {:?}",
                        key, raw
                    ))),
                },
                None => Ok(default),
            }
        };

        Ok(Self {
            host: non_empty("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            api_key: lookup("BAIDU_AI_API_KEY").unwrap_or_default(),
            secret_key: lookup("BAIDU_AI_SECRET_KEY").unwrap_or_default(),
            token_url: non_empty("BAIDU_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            classify_url: non_empty("BAIDU_ANIMAL_URL")
                .unwrap_or_else(|| DEFAULT_CLASSIFY_URL.to_string()),
            token_timeout: seconds("TOKEN_TIMEOUT_SECS", DEFAULT_TOKEN_TIMEOUT)?,
            classify_timeout: seconds("CLASSIFY_TIMEOUT_SECS", DEFAULT_CLASSIFY_TIMEOUT)?,
            catalog_path: non_empty("FISH_CATALOG_PATH").map(PathBuf::from),
            limits: ValidationLimits::default(),
            compression: CompressionConfig::default(),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.secret_key.trim().is_empty()
    }

    pub fn load_catalog(&self) -> Result<SpeciesCatalog, ConfigError> {
        match &self.catalog_path {
            Some(path) => SpeciesCatalog::load(path),
            None => Ok(SpeciesCatalog::builtin()),
        }
    }

    pub fn build_recognizer(&self) -> Result<LiveRecognizer, ConfigError> {
        let catalog = Arc::new(self.load_catalog()?);
        let transport = ReqwestTransport::default();
        let credentials = OAuthCredentialProvider::new(
            transport.clone(),
            self.api_key.clone(),
            self.secret_key.clone(),
        )
        .with_token_url(self.token_url.clone())
        .with_timeout(self.token_timeout);
        let client = ClassifierClient::new(transport, credentials)
            .with_endpoint(self.classify_url.clone())
            .with_timeout(self.classify_timeout);

        Ok(FishRecognizer::new(
            ImageValidator::new(self.limits),
            FormatNormalizer::default(),
            SizeCompressor::new(self.compression),
            client,
            ResultSelector::new(catalog),
        ))
    }
}
