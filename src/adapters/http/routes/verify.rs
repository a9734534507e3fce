//! Verification and decode endpoints.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::token_codec::TransactionClaims,
    domain::entities::subscription::StoreEnvironment,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyApplePayload {
    #[serde(default)]
    transaction_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyReceiptPayload {
    #[serde(default)]
    receipt_data: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyAndroidPayload {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    is_subscription: bool,
}

#[derive(Deserialize)]
struct DecodePayload {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Serialize)]
struct VerifyAppleResponse {
    success: bool,
    environment: StoreEnvironment,
    data: serde_json::Value,
    decoded: Option<TransactionClaims>,
}

#[derive(Serialize)]
struct VerifyReceiptResponse {
    success: bool,
    environment: StoreEnvironment,
    data: serde_json::Value,
}

#[derive(Serialize)]
struct VerifyAndroidResponse {
    success: bool,
    data: serde_json::Value,
}

#[derive(Serialize)]
struct DecodeResponse {
    success: bool,
    decoded: serde_json::Value,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify/apple", post(verify_apple))
        .route("/verify/receipt", post(verify_receipt))
        .route("/verify/android", post(verify_android))
        .route("/decode", post(decode_token))
}

async fn verify_apple(
    State(app_state): State<AppState>,
    Json(payload): Json<VerifyApplePayload>,
) -> AppResult<impl IntoResponse> {
    let transaction_id = required(payload.transaction_id, "Transaction ID is required")?;

    let verification = app_state
        .verification_use_cases
        .verify_apple_transaction(&transaction_id)
        .await?;

    Ok(Json(VerifyAppleResponse {
        success: true,
        environment: verification.environment,
        data: verification.data,
        decoded: verification.decoded,
    }))
}

async fn verify_receipt(
    State(app_state): State<AppState>,
    Json(payload): Json<VerifyReceiptPayload>,
) -> AppResult<impl IntoResponse> {
    let receipt_data = required(payload.receipt_data, "Receipt Data (Base64) is required")?;

    let verification = app_state
        .verification_use_cases
        .verify_legacy_receipt(&receipt_data)
        .await?;

    Ok(Json(VerifyReceiptResponse {
        success: true,
        environment: verification.environment,
        data: verification.data,
    }))
}

async fn verify_android(
    State(app_state): State<AppState>,
    Json(payload): Json<VerifyAndroidPayload>,
) -> AppResult<impl IntoResponse> {
    let product_id = required(
        payload.product_id,
        "Product ID (or Subscription ID) and Token are required",
    )?;
    let token = required(
        payload.token,
        "Product ID (or Subscription ID) and Token are required",
    )?;

    let verification = app_state
        .verification_use_cases
        .verify_android(&product_id, &token, payload.is_subscription)
        .await?;

    Ok(Json(VerifyAndroidResponse {
        success: true,
        data: verification.data,
    }))
}

async fn decode_token(
    State(app_state): State<AppState>,
    Json(payload): Json<DecodePayload>,
) -> AppResult<impl IntoResponse> {
    let token = required(payload.token, "Token is required")?;

    let decoded = app_state.verification_use_cases.decode_token(&token)?;

    Ok(Json(DecodeResponse {
        success: true,
        decoded,
    }))
}

fn required(field: Option<String>, message: &str) -> AppResult<String> {
    field
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::InvalidInput(message.to_string()))
}
