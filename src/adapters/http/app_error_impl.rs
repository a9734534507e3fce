use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::MalformedToken => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::MalformedToken, None)
            }
            AppError::Upstream(msg) => {
                error_resp(StatusCode::BAD_GATEWAY, ErrorCode::UpstreamError, Some(msg))
            }
            AppError::Persistence(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::PersistenceError,
                None,
            ),
            AppError::ProviderNotConfigured(provider) => error_resp(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ProviderNotConfigured,
                Some(format!("{provider} credentials are not configured")),
            ),
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                None,
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
