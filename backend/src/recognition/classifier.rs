use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::RecognitionError;
use super::compressor::CompressedImage;
use super::credentials::CredentialProvider;
use super::transport::HttpTransport;

pub const DEFAULT_CLASSIFY_URL: &str = "https://aip.baidubce.com/rest/2.0/image-classify/v1/animal";
pub const DEFAULT_CLASSIFY_TIMEOUT: Duration = Duration::from_secs(15);
pub const TOP_NUM: u32 = 6;
pub const BAIKE_NUM: u32 = 1;

/// One entry of the provider's ranked answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateLabel {
    pub name: String,
    pub confidence_score: f64,
    pub description: Option<String>,
}

// Scores come back as decimal strings; anything unreadable counts as 0.0.
fn deserialize_lenient_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    // NaN and infinities would serialize as null in the response.
    Ok(score.filter(|v| v.is_finite()).unwrap_or(0.0))
}

#[derive(Debug, Deserialize)]
struct BaikeInfo {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "deserialize_lenient_score")]
    score: f64,
    #[serde(default)]
    baike_info: Option<BaikeInfo>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    #[serde(default)]
    log_id: Option<Value>,
    #[serde(default)]
    result: Option<Vec<RawLabel>>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_msg: Option<String>,
}

impl From<RawLabel> for CandidateLabel {
    fn from(raw: RawLabel) -> Self {
        Self {
            name: raw.name,
            confidence_score: raw.score,
            description: raw
                .baike_info
                .and_then(|info| info.description)
                .filter(|d| !d.trim().is_empty()),
        }
    }
}

/// A successful provider answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Provider-side id of the call, quoted when reporting issues upstream.
    pub log_id: Option<String>,
    pub labels: Vec<CandidateLabel>,
}

/// Parses a classification body into ranked labels.
pub fn parse_response(body: &str) -> Result<Classification, RecognitionError> {
    let response: RecognitionResponse = serde_json::from_str(body)
        .map_err(|e| RecognitionError::ResponseParseError(e.to_string()))?;

    let code = response.error_code.unwrap_or(0);
    if code != 0 {
        return Err(RecognitionError::ClassifierRejected {
            code,
            message: response.error_msg.unwrap_or_default(),
        });
    }

    let log_id = response.log_id.map(|id| match id {
        Value::String(s) => s,
        other => other.to_string(),
    });

    Ok(Classification {
        log_id,
        labels: response
            .result
            .unwrap_or_default()
            .into_iter()
            .map(CandidateLabel::from)
            .collect(),
    })
}

pub struct ClassifierClient<T, C> {
    transport: T,
    credentials: C,
    endpoint: String,
    timeout: Duration,
    top_num: u32,
    baike_num: u32,
}

impl<T: HttpTransport, C: CredentialProvider> ClassifierClient<T, C> {
    pub fn new(transport: T, credentials: C) -> Self {
        Self {
            transport,
            credentials,
            endpoint: DEFAULT_CLASSIFY_URL.to_string(),
            timeout: DEFAULT_CLASSIFY_TIMEOUT,
            top_num: TOP_NUM,
            baike_num: BAIKE_NUM,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetches a fresh credential, then submits the image. No retries.
    pub async fn classify(
        &self,
        img: &CompressedImage,
    ) -> Result<Classification, RecognitionError> {
        let credential = self.credentials.fetch().await?;

        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            RecognitionError::ClassifierUnavailable(format!("无效的服务地址: {}", e))
        })?;
        url.query_pairs_mut()
            .append_pair("access_token", &credential.access_token);

        let encoded = STANDARD.encode(img.bytes());
        let top_num = self.top_num.to_string();
        let baike_num = self.baike_num.to_string();
        let form = [
            ("image", encoded.as_str()),
            ("top_num", top_num.as_str()),
            ("baike_num", baike_num.as_str()),
        ];

        let response = self
            .transport
            .post_form(url.as_str(), &form, self.timeout)
            .await
            .map_err(|e| {
                RecognitionError::ClassifierUnavailable(format!("请求发送失败: {}", e))
            })?;

        parse_response(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::compressor::SizeCompressor;
    use crate::recognition::credentials::{DEFAULT_TOKEN_URL, OAuthCredentialProvider};
    use crate::recognition::normalizer::FormatNormalizer;
    use crate::recognition::test_support::{StubTransport, encode_jpeg, noisy_image};
    use crate::recognition::validator::ImageValidator;

    const TOKEN_OK: &str = r#"{"access_token":"24.token","expires_in":2592000}"#;

    fn compressed_image() -> CompressedImage {
        let jpeg = encode_jpeg(&noisy_image(64, 64, 31), 90);
        let validated = ImageValidator::default().validate(&jpeg).unwrap();
        let normalized = FormatNormalizer::default().normalize(validated).unwrap();
        SizeCompressor::default().compress(normalized).unwrap()
    }

    fn client(
        transport: &StubTransport,
    ) -> ClassifierClient<&StubTransport, OAuthCredentialProvider<&StubTransport>> {
        let credentials = OAuthCredentialProvider::new(transport, "key".into(), "secret".into());
        ClassifierClient::new(transport, credentials)
    }

    #[test]
    fn test_parse_string_and_numeric_scores() {
        let parsed = parse_response(
            r#"{"log_id":1,"result":[{"name":"鲤鱼","score":"0.95"},{"name":"草鱼","score":0.25},{"name":"鱼","score":"n/a"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.log_id.as_deref(), Some("1"));
        let labels = parsed.labels;
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0].confidence_score, 0.95);
        assert_eq!(labels[1].confidence_score, 0.25);
        assert_eq!(labels[2].confidence_score, 0.0);
    }

    #[test]
    fn test_parse_non_finite_scores_as_zero() {
        let labels = parse_response(
            r#"{"result":[{"name":"鲤鱼","score":"NaN"},{"name":"草鱼","score":"inf"},{"name":"鲫鱼","score":"-infinity"}]}"#,
        )
        .unwrap()
        .labels;
        assert!(labels.iter().all(|l| l.confidence_score == 0.0));

        let result = shared::ClassificationResult {
            name: labels[0].name.clone(),
            score: labels[0].confidence_score,
            description: String::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["score"], serde_json::json!(0.0));
    }

    #[test]
    fn test_parse_baike_description() {
        let labels = parse_response(
            r#"{"result":[{"name":"鲤鱼","score":"0.9","baike_info":{"baike_url":"http://x","description":"鲤科鱼类"}},{"name":"猫","score":"0.1","baike_info":{}}]}"#,
        )
        .unwrap()
        .labels;
        assert_eq!(labels[0].description.as_deref(), Some("鲤科鱼类"));
        assert_eq!(labels[1].description, None);
    }

    #[test]
    fn test_parse_empty_result_is_success() {
        let parsed = parse_response(r#"{"log_id":"7","result":[]}"#).unwrap();
        assert!(parsed.labels.is_empty());
        assert_eq!(parsed.log_id.as_deref(), Some("7"));
        assert!(parse_response(r#"{"log_id":7}"#).unwrap().labels.is_empty());
    }

    #[test]
    fn test_parse_error_code() {
        match parse_response(r#"{"error_code":216201,"error_msg":"image format error"}"#) {
            Err(RecognitionError::ClassifierRejected { code, message }) => {
                assert_eq!(code, 216201);
                assert_eq!(message, "image format error");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_response("not json"),
            Err(RecognitionError::ResponseParseError(_))
        ));
        assert!(matches!(
            parse_response(r#"{"result":"oops"}"#),
            Err(RecognitionError::ResponseParseError(_))
        ));
    }

    #[actix_web::test]
    async fn test_classify_submits_form() {
        let transport = StubTransport::new()
            .reply(DEFAULT_TOKEN_URL, TOKEN_OK)
            .reply(
                DEFAULT_CLASSIFY_URL,
                r#"{"log_id":42,"result":[{"name":"鲤鱼","score":"0.95"}]}"#,
            );
        let image = compressed_image();

        let answer = client(&transport).classify(&image).await.unwrap();
        assert_eq!(answer.log_id.as_deref(), Some("42"));
        assert_eq!(answer.labels.len(), 1);
        assert_eq!(answer.labels[0].name, "鲤鱼");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        let submit = &requests[1];
        assert_eq!(
            submit.url,
            format!("{}?access_token=24.token", DEFAULT_CLASSIFY_URL)
        );
        assert_eq!(submit.timeout, DEFAULT_CLASSIFY_TIMEOUT);
        assert_eq!(submit.field("top_num"), Some("6"));
        assert_eq!(submit.field("baike_num"), Some("1"));
        let decoded = STANDARD.decode(submit.field("image").unwrap()).unwrap();
        assert_eq!(decoded, image.bytes());
    }

    #[actix_web::test]
    async fn test_credential_failure_skips_classification() {
        let transport = StubTransport::new()
            .reply(
                DEFAULT_TOKEN_URL,
                r#"{"error":"invalid_client","error_description":"bad"}"#,
            )
            .reply(DEFAULT_CLASSIFY_URL, r#"{"result":[]}"#);
        let result = client(&transport).classify(&compressed_image()).await;
        assert!(matches!(result, Err(RecognitionError::CredentialError(_))));
        assert_eq!(transport.requests().len(), 1);
    }

    #[actix_web::test]
    async fn test_timeout_is_unavailable() {
        let transport = StubTransport::new()
            .reply(DEFAULT_TOKEN_URL, TOKEN_OK)
            .time_out(DEFAULT_CLASSIFY_URL);
        let result = client(&transport).classify(&compressed_image()).await;
        assert!(matches!(result, Err(RecognitionError::ClassifierUnavailable(_))));
    }

    #[actix_web::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let transport = StubTransport::new().reply(DEFAULT_TOKEN_URL, TOKEN_OK);
        let result = client(&transport)
            .with_endpoint("https://classifier.invalid/animal")
            .classify(&compressed_image())
            .await;
        assert!(matches!(result, Err(RecognitionError::ClassifierUnavailable(_))));
    }

    #[actix_web::test]
    async fn test_rejection_is_surfaced() {
        let transport = StubTransport::new()
            .reply(DEFAULT_TOKEN_URL, TOKEN_OK)
            .reply(
                DEFAULT_CLASSIFY_URL,
                r#"{"error_code":17,"error_msg":"Open api daily request limit reached"}"#,
            );
        let result = client(&transport).classify(&compressed_image()).await;
        assert!(matches!(
            result,
            Err(RecognitionError::ClassifierRejected { code: 17, .. })
        ));
    }
}
