use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, ResponseError, web};
use futures::{StreamExt, TryStreamExt};
use log::{info, warn};
use serde_json::json;
use shared::ErrorResponse;

use crate::recognition::{CredentialProvider, FishRecognizer, HttpTransport, RecognitionError};

const IMAGE_FIELD: &str = "image";

impl ResponseError for RecognitionError {
    fn status_code(&self) -> StatusCode {
        match self {
            RecognitionError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RecognitionError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RecognitionError::NoResult => StatusCode::UNPROCESSABLE_ENTITY,
            RecognitionError::TooSmall { .. } => StatusCode::BAD_REQUEST,
            RecognitionError::CredentialError(_)
            | RecognitionError::ClassifierUnavailable(_)
            | RecognitionError::ClassifierRejected { .. }
            | RecognitionError::ResponseParseError(_) => StatusCode::BAD_GATEWAY,
            RecognitionError::DecodeError(_) | RecognitionError::EncodeError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

pub fn configure_routes<T, C>(cfg: &mut web::ServiceConfig)
where
    T: HttpTransport + 'static,
    C: CredentialProvider + 'static,
{
    cfg.service(web::resource("/api/health").route(web::get().to(health)))
        .service(
            web::resource("/api/fish-recognition").route(web::post().to(recognize_fish::<T, C>)),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn recognize_fish<T, C>(
    recognizer: web::Data<FishRecognizer<T, C>>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error>
where
    T: HttpTransport + 'static,
    C: CredentialProvider + 'static,
{
    // One byte past the limit is enough for the validator to reject it.
    let read_limit = recognizer.max_upload_bytes().saturating_add(1);
    let mut image: Option<(Vec<u8>, String)> = None;

    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(IMAGE_FIELD) || image.is_some() {
            // Drain fields we do not use so the stream can advance.
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or("")
            .to_string();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() < read_limit {
                let take = chunk.len().min(read_limit - data.len());
                data.extend_from_slice(&chunk[..take]);
            }
        }
        image = Some((data, filename));
    }

    let Some((data, filename)) = image else {
        warn!("Fish recognition request without an '{}' field", IMAGE_FIELD);
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "未提供图片".to_string(),
        }));
    };

    info!("Fish recognition upload '{}' ({} bytes)", filename, data.len());
    let result = recognizer.recognize(&data).await?;
    Ok(HttpResponse::Ok().json(result))
}
