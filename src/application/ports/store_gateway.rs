//! Store gateway ports.
//!
//! The verification use cases talk to Apple and Google through these traits;
//! production implementations live in `infra`, in-memory mocks in
//! `test_utils`. Gateways return the raw verification responses — claim
//! decoding and reconciliation happen in the application layer. Failures
//! surface as `AppError::Upstream`; retry policy, if any, belongs to the
//! implementation.

use async_trait::async_trait;

use crate::app_error::AppResult;

#[async_trait]
pub trait AppleStoreGateway: Send + Sync {
    /// App Store Server API transaction lookup.
    async fn fetch_transaction(&self, transaction_id: &str) -> AppResult<serde_json::Value>;

    /// Legacy `verifyReceipt` call for base64 receipt blobs.
    async fn verify_legacy_receipt(&self, receipt_data: &str) -> AppResult<serde_json::Value>;

    /// App Store Connect listing of the subscriptions in a group.
    async fn fetch_subscription_group(&self, group_id: &str) -> AppResult<serde_json::Value>;
}

#[async_trait]
pub trait GooglePlayGateway: Send + Sync {
    /// One-time product purchase lookup.
    async fn verify_product(&self, product_id: &str, token: &str)
    -> AppResult<serde_json::Value>;

    /// Subscription purchase lookup.
    async fn verify_subscription(
        &self,
        subscription_id: &str,
        token: &str,
    ) -> AppResult<serde_json::Value>;
}
