//! JSON envelopes and error-to-status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorCode, ExtractError, FieldIssue};
use crate::model::{ExtractionMethod, ExtractionOutput, ExtractionResult};

/// Body of a successful `POST /extract`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub success: bool,
    pub data: ExtractionResult,
    pub metadata: ResponseMetadata,
    /// Milliseconds from request receipt to response.
    pub processing_time: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub file_name: String,
    pub file_size: usize,
    pub mime_type: String,
    pub method: ExtractionMethod,
    pub warnings: Vec<FieldIssue>,
    pub ocr_confidence: Option<f32>,
    pub used_fallback: bool,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ExtractResponse {
    pub fn new(
        output: ExtractionOutput,
        file_name: String,
        file_size: usize,
        mime_type: String,
        processing_time: u64,
    ) -> Self {
        Self {
            success: true,
            data: output.result,
            metadata: ResponseMetadata {
                file_name,
                file_size,
                mime_type,
                method: output.method,
                warnings: output.warnings,
                ocr_confidence: output.stats.ocr_confidence,
                used_fallback: output.stats.used_fallback,
                input_tokens: output.stats.input_tokens,
                output_tokens: output.stats.output_tokens,
            },
            processing_time,
        }
    }
}

/// Body of every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_configured: bool,
    pub ocr_enabled: bool,
    pub vision_enabled: bool,
}

/// HTTP status for an error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NoFileProvided | ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::UnsupportedFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorCode::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::ImageProcessingFailed
        | ErrorCode::PdfProcessingFailed
        | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// [`ExtractError`] as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ExtractError);

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = status_for(code);

        if status.is_server_error() {
            tracing::error!(code = %code, error = %self.0, "Extraction failed");
        } else {
            tracing::warn!(code = %code, error = %self.0, "Request rejected");
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code,
                message: self.0.to_string(),
                details: self.0.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(ErrorCode::NoFileProvided), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCode::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCode::FileTooLarge), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            status_for(ErrorCode::UnsupportedFileType),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_for(ErrorCode::ValidationFailed),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(ErrorCode::PdfProcessingFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_envelope_omits_empty_details() {
        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code: ErrorCode::NoFileProvided,
                message: "no file".into(),
                details: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NO_FILE_PROVIDED");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn health_is_camel_case() {
        let json = serde_json::to_value(HealthResponse {
            status: "ok",
            version: "1.0.0",
            llm_configured: false,
            ocr_enabled: true,
            vision_enabled: true,
        })
        .unwrap();
        assert_eq!(json["llmConfigured"], false);
        assert_eq!(json["visionEnabled"], true);
    }
}
