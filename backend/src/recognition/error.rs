/// Failures raised by the fish recognition pipeline.
///
/// Each variant belongs to exactly one stage, so callers can tell which step
/// stopped the request without inspecting messages.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("图片文件过小（至少需要{min}字节，实际{actual}字节）")]
    TooSmall { actual: usize, min: usize },
    /// `actual` may be a lower bound when the upload was truncated while reading.
    #[error("图片文件过大（最大支持{max}字节，实际至少{actual}字节）")]
    TooLarge { actual: usize, max: usize },
    #[error("只支持JPEG和PNG格式: {0}")]
    UnsupportedFormat(String),
    #[error("图片解码失败: {0}")]
    DecodeError(String),
    #[error("图片编码失败: {0}")]
    EncodeError(String),
    #[error("获取访问令牌失败: {0}")]
    CredentialError(String),
    #[error("识别服务调用失败: {0}")]
    ClassifierUnavailable(String),
    #[error("解析响应失败: {0}")]
    ResponseParseError(String),
    #[error("识别失败: {message} (错误码: {code})")]
    ClassifierRejected { code: i64, message: String },
    #[error("未识别到鱼类")]
    NoResult,
}

impl RecognitionError {
    /// True when the failure was caused by the uploaded content rather than
    /// by this service or its provider.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RecognitionError::TooSmall { .. }
                | RecognitionError::TooLarge { .. }
                | RecognitionError::UnsupportedFormat(_)
                | RecognitionError::NoResult
        )
    }
}
