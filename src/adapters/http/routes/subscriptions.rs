//! Read endpoints over the subscription store and App Store Connect.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState, app_error::AppResult,
    domain::entities::subscription::SubscriptionRecord,
};

#[derive(Serialize)]
struct SubscriptionsResponse {
    success: bool,
    subscriptions: Vec<SubscriptionRecord>,
}

#[derive(Serialize)]
struct GroupResponse {
    success: bool,
    data: serde_json::Value,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", get(list_subscriptions))
        .route(
            "/subscription-groups/{id}/subscriptions",
            get(subscription_group),
        )
}

async fn list_subscriptions(
    State(app_state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let subscriptions = app_state.verification_use_cases.list_subscriptions().await?;
    Ok(Json(SubscriptionsResponse {
        success: true,
        subscriptions,
    }))
}

async fn subscription_group(
    State(app_state): State<AppState>,
    Path(group_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let data = app_state
        .verification_use_cases
        .subscription_group(&group_id)
        .await?;
    Ok(Json(GroupResponse {
        success: true,
        data,
    }))
}
