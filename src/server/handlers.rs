//! Request handlers.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use std::time::Instant;
use tracing::{debug, info};

use super::response::{ApiError, ExtractResponse, HealthResponse};
use super::AppState;
use crate::config::mime_essence;
use crate::error::ExtractError;
use crate::pipeline::input::sniff_mime;

/// Name of the multipart part carrying the document.
const FILE_FIELD: &str = "file";

struct Upload {
    file_name: String,
    mime: String,
    bytes: Vec<u8>,
}

/// `POST /extract`
#[tracing::instrument(skip(state, multipart))]
pub async fn extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let start = Instant::now();
    let max = state.extractor.config().max_file_size;

    let mut multipart =
        multipart.map_err(|rejection| ExtractError::InvalidRequest(rejection.body_text()))?;
    let upload = read_upload(&mut multipart, max)
        .await?
        .ok_or(ExtractError::NoFileProvided)?;

    info!(
        file_name = %upload.file_name,
        mime = %upload.mime,
        bytes = upload.bytes.len(),
        "Upload received"
    );

    let output = state.extractor.extract(&upload.bytes, &upload.mime).await?;

    Ok(Json(ExtractResponse::new(
        output,
        upload.file_name,
        upload.bytes.len(),
        upload.mime,
        start.elapsed().as_millis() as u64,
    )))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let extractor = &state.extractor;
    let config = extractor.config();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        llm_configured: extractor.llm_configured(),
        ocr_enabled: config.enable_ocr && extractor.ocr_available(),
        vision_enabled: config.enable_vision,
    })
}

/// Find the `file` part; every other part is skipped.
async fn read_upload(multipart: &mut Multipart, max: usize) -> Result<Option<Upload>, ExtractError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        // Browsers send octet-stream for files they cannot type.
        let declared = field
            .content_type()
            .filter(|ct| mime_essence(ct) != "application/octet-stream")
            .map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, max))?;
        let mime = declared.unwrap_or_else(|| sniff_mime(&bytes));

        return Ok(Some(Upload {
            file_name,
            mime,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError, max: usize) -> ExtractError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // The body was cut off at the limit, so its real size is unknown.
        ExtractError::FileTooLarge { size: max + 1, max }
    } else {
        ExtractError::InvalidRequest(e.body_text())
    }
}
