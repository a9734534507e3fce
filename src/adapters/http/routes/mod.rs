pub mod subscriptions;
pub mod verify;
pub mod webhooks;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(verify::router())
        .merge(webhooks::router())
        .merge(subscriptions::router())
}
