//! Verification orchestration: store gateways in, decoded claims through the
//! codec, canonical records out via the reconciliation engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::store_gateway::{AppleStoreGateway, GooglePlayGateway},
    application::token_codec::{self, NotificationPayload, TransactionClaims},
    application::use_cases::reconciliation::{
        ReconciliationEngine, SubscriptionStore, VerifiedTransaction,
    },
    domain::entities::subscription::{Platform, StoreEnvironment, SubscriptionRecord},
};

/// One entry of `latest_receipt_info[]` in a legacy `verifyReceipt` response.
/// Numeric fields arrive as string-encoded milliseconds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LatestReceiptInfo {
    pub original_transaction_id: Option<String>,
    pub transaction_id: Option<String>,
    pub product_id: Option<String>,
    pub purchase_date_ms: Option<String>,
    pub expires_date_ms: Option<String>,
}

/// Subscription purchase resource from the Google Play Developer API.
/// Timestamps are string-encoded milliseconds here as well.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AndroidSubscriptionPurchase {
    pub order_id: Option<String>,
    pub start_time_millis: Option<String>,
    pub expiry_time_millis: Option<String>,
    /// Present only for licence-tested or promo purchases; `0` means test.
    pub purchase_type: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AppleVerification {
    pub environment: StoreEnvironment,
    pub data: serde_json::Value,
    pub decoded: Option<TransactionClaims>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptVerification {
    pub environment: StoreEnvironment,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct AndroidVerification {
    pub data: serde_json::Value,
}

#[derive(Debug)]
pub struct NotificationOutcome {
    pub notification_type: String,
    pub record: SubscriptionRecord,
}

pub struct VerificationUseCases {
    apple: Arc<dyn AppleStoreGateway>,
    google: Arc<dyn GooglePlayGateway>,
    engine: ReconciliationEngine,
    environment: StoreEnvironment,
}

impl VerificationUseCases {
    pub fn new(
        apple: Arc<dyn AppleStoreGateway>,
        google: Arc<dyn GooglePlayGateway>,
        store: Arc<dyn SubscriptionStore>,
        environment: StoreEnvironment,
    ) -> Self {
        Self {
            apple,
            google,
            engine: ReconciliationEngine::new(store),
            environment,
        }
    }

    /// Verify a StoreKit 2 transaction id against the App Store Server API
    /// and persist the decoded transaction as an active lineage snapshot.
    pub async fn verify_apple_transaction(
        &self,
        transaction_id: &str,
    ) -> AppResult<AppleVerification> {
        tracing::info!(transaction_id, environment = %self.environment, "Verifying transaction");

        let data = self.apple.fetch_transaction(transaction_id).await?;
        let decoded = data
            .get("signedTransactionInfo")
            .and_then(|v| v.as_str())
            .and_then(token_codec::decode::<TransactionClaims>);

        if let Some(claims) = &decoded {
            let transaction = self.claims_to_transaction(claims, Platform::Apple)?;
            self.engine.record_verification(transaction).await?;
        }

        Ok(AppleVerification {
            environment: self.environment,
            data,
            decoded,
        })
    }

    /// Verify a base64 receipt blob against the legacy `verifyReceipt`
    /// endpoint. Subscription receipts carry `latest_receipt_info`; the
    /// newest entry is persisted after coercing its string-millisecond
    /// fields. Receipts without one (consumables, one-time purchases) verify
    /// without persisting.
    pub async fn verify_legacy_receipt(
        &self,
        receipt_data: &str,
    ) -> AppResult<ReceiptVerification> {
        tracing::info!(environment = %self.environment, "Verifying legacy receipt");

        let data = self.apple.verify_legacy_receipt(receipt_data).await?;

        let latest = data
            .get("latest_receipt_info")
            .and_then(|v| v.as_array())
            .and_then(|entries| entries.first());
        if let Some(entry) = latest {
            let info: LatestReceiptInfo =
                serde_json::from_value(entry.clone()).unwrap_or_default();
            if let Some(transaction) = self.legacy_transaction(&info) {
                self.engine.record_verification(transaction).await?;
            }
        }

        Ok(ReceiptVerification {
            environment: self.environment,
            data,
        })
    }

    /// Verify a Google Play purchase token. Subscriptions are persisted under
    /// the base order id of their lineage; one-time products only verify.
    pub async fn verify_android(
        &self,
        product_id: &str,
        token: &str,
        is_subscription: bool,
    ) -> AppResult<AndroidVerification> {
        tracing::info!(product_id, is_subscription, "Verifying Android transaction");

        let data = if is_subscription {
            let data = self.google.verify_subscription(product_id, token).await?;
            let purchase: AndroidSubscriptionPurchase =
                serde_json::from_value(data.clone()).unwrap_or_default();
            if let Some(transaction) = android_transaction(product_id, &purchase) {
                self.engine.record_verification(transaction).await?;
            }
            data
        } else {
            self.google.verify_product(product_id, token).await?
        };

        Ok(AndroidVerification { data })
    }

    /// Debug decode of an arbitrary JWS token.
    pub fn decode_token(&self, token: &str) -> AppResult<serde_json::Value> {
        token_codec::decode(token).ok_or(AppError::MalformedToken)
    }

    /// Apply one App Store Server Notification (`signedPayload`) to the store.
    pub async fn process_apple_notification(
        &self,
        signed_payload: &str,
    ) -> AppResult<NotificationOutcome> {
        let payload: NotificationPayload =
            token_codec::decode(signed_payload).ok_or(AppError::MalformedToken)?;

        let signed_transaction_info =
            payload.data.signed_transaction_info.as_deref().ok_or_else(|| {
                AppError::InvalidInput("signedPayload carries no transaction info".to_string())
            })?;
        let claims: TransactionClaims =
            token_codec::decode(signed_transaction_info).ok_or(AppError::MalformedToken)?;

        let record = self
            .engine
            .apply_notification(&payload.notification_type, &claims)
            .await?;

        Ok(NotificationOutcome {
            notification_type: payload.notification_type,
            record,
        })
    }

    pub async fn list_subscriptions(&self) -> AppResult<Vec<SubscriptionRecord>> {
        self.engine.list().await
    }

    /// App Store Connect passthrough: subscriptions belonging to a group.
    pub async fn subscription_group(&self, group_id: &str) -> AppResult<serde_json::Value> {
        tracing::info!(group_id, "Fetching subscriptions for group");
        self.apple.fetch_subscription_group(group_id).await
    }

    fn claims_to_transaction(
        &self,
        claims: &TransactionClaims,
        platform: Platform,
    ) -> AppResult<VerifiedTransaction> {
        let original_transaction_id = claims
            .original_transaction_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::InvalidInput("originalTransactionId is required".to_string())
            })?;

        Ok(VerifiedTransaction {
            transaction_id: claims
                .transaction_id
                .clone()
                .unwrap_or_else(|| original_transaction_id.clone()),
            original_transaction_id,
            product_id: claims.product_id.clone().unwrap_or_default(),
            purchase_date: claims.purchase_date.unwrap_or_default(),
            expiration_date: claims.expires_date,
            environment: claims.environment.unwrap_or(self.environment),
            platform,
        })
    }

    fn legacy_transaction(&self, info: &LatestReceiptInfo) -> Option<VerifiedTransaction> {
        let original_transaction_id = info
            .original_transaction_id
            .clone()
            .filter(|id| !id.is_empty())?;

        Some(VerifiedTransaction {
            transaction_id: info
                .transaction_id
                .clone()
                .unwrap_or_else(|| original_transaction_id.clone()),
            original_transaction_id,
            product_id: info.product_id.clone().unwrap_or_default(),
            purchase_date: info
                .purchase_date_ms
                .as_deref()
                .and_then(parse_millis)
                .unwrap_or_default(),
            expiration_date: info.expires_date_ms.as_deref().and_then(parse_millis),
            environment: self.environment,
            platform: Platform::AppleLegacy,
        })
    }
}

/// Renewal orders share the base order id with a `..N` suffix appended; the
/// base identifies the lineage.
fn base_order_id(order_id: &str) -> &str {
    order_id.split("..").next().unwrap_or(order_id)
}

fn parse_millis(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn android_transaction(
    subscription_id: &str,
    purchase: &AndroidSubscriptionPurchase,
) -> Option<VerifiedTransaction> {
    let order_id = purchase.order_id.clone().filter(|id| !id.is_empty())?;

    Some(VerifiedTransaction {
        original_transaction_id: base_order_id(&order_id).to_string(),
        transaction_id: order_id.clone(),
        product_id: subscription_id.to_string(),
        purchase_date: purchase
            .start_time_millis
            .as_deref()
            .and_then(parse_millis)
            .unwrap_or_default(),
        expiration_date: purchase.expiry_time_millis.as_deref().and_then(parse_millis),
        environment: if purchase.purchase_type == Some(0) {
            StoreEnvironment::Sandbox
        } else {
            StoreEnvironment::Production
        },
        platform: Platform::Android,
    })
}
