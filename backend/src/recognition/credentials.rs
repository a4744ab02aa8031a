use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use super::RecognitionError;
use super::transport::HttpTransport;

pub const DEFAULT_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Bearer token for the classification endpoint. Lives for one pipeline run.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCredential")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

pub trait CredentialProvider {
    fn fetch(&self) -> impl Future<Output = Result<AccessCredential, RecognitionError>>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client-credentials exchange against the provider's OAuth endpoint.
#[derive(Clone)]
pub struct OAuthCredentialProvider<T> {
    transport: T,
    token_url: String,
    api_key: String,
    secret_key: String,
    timeout: Duration,
}

impl<T: HttpTransport> OAuthCredentialProvider<T> {
    pub fn new(transport: T, api_key: String, secret_key: String) -> Self {
        Self {
            transport,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_key,
            secret_key,
            timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<T: HttpTransport> CredentialProvider for OAuthCredentialProvider<T> {
    async fn fetch(&self) -> Result<AccessCredential, RecognitionError> {
        if self.api_key.trim().is_empty() || self.secret_key.trim().is_empty() {
            return Err(RecognitionError::CredentialError(
                "未配置百度API密钥".to_string(),
            ));
        }

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.api_key.as_str()),
            ("client_secret", self.secret_key.as_str()),
        ];

        let response = self
            .transport
            .post_form(&self.token_url, &form, self.timeout)
            .await
            .map_err(|e| RecognitionError::CredentialError(format!("请求Token失败: {}", e)))?;

        let token: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            RecognitionError::CredentialError(format!(
                "解析Token响应失败 (HTTP {}): {}",
                response.status, e
            ))
        })?;

        if let Some(error) = token.error.filter(|e| !e.is_empty()) {
            let description = token.error_description.unwrap_or_default();
            return Err(RecognitionError::CredentialError(format!(
                "{}: {}",
                error, description
            )));
        }

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(AccessCredential {
                access_token,
                expires_in: token.expires_in,
            }),
            _ => Err(RecognitionError::CredentialError(
                "Token响应缺少access_token".to_string(),
            )),
        }
    }
}
