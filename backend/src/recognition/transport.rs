use reqwest::Client as HttpClient;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Form-encoded POST with a per-call deadline.
///
/// Bodies are returned whatever the status code; the provider reports
/// failures inside the JSON payload.
pub trait HttpTransport {
    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        timeout: Duration,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http_client: HttpClient,
}

impl ReqwestTransport {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else {
                TransportError::Request(e.without_url().to_string())
            }
        };

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_err)?;
        Ok(TransportResponse { status, body })
    }
}
