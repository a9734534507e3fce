//! App Store Server Notification endpoint.
//!
//! Delivery is at-least-once; the reconciliation engine makes re-applying a
//! notification safe, so the handler can acknowledge every processed payload
//! with 200. Undecodable payloads are rejected with 400, never silently
//! swallowed as success.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload {
    #[serde(default)]
    signed_payload: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookResponse {
    success: bool,
    notification_type: String,
    original_transaction_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/apple", post(apple_webhook))
}

async fn apple_webhook(
    State(app_state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> AppResult<impl IntoResponse> {
    let signed_payload = payload
        .signed_payload
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::InvalidInput("signedPayload is required".to_string()))?;

    let outcome = app_state
        .verification_use_cases
        .process_apple_notification(&signed_payload)
        .await?;

    Ok(Json(WebhookResponse {
        success: true,
        notification_type: outcome.notification_type,
        original_transaction_id: outcome.record.original_transaction_id,
    }))
}
