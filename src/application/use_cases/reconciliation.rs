//! Reconciliation of verification results and store notifications onto the
//! subscription store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    app_error::{AppError, AppResult},
    application::token_codec::TransactionClaims,
    domain::entities::subscription::{
        Platform, RecordPatch, StoreEnvironment, SubscriptionRecord, SubscriptionStatus,
    },
};

/// Durable keyed storage of subscription records.
///
/// Implementations must linearize `upsert` calls: the store is the single
/// system of record and concurrent notifications for different lineages must
/// not lose each other's writes.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Merge the patch into the record with the same lineage key, or create
    /// a new record from it. Returns the resulting record.
    async fn upsert(&self, patch: RecordPatch) -> AppResult<SubscriptionRecord>;

    async fn get(&self, original_transaction_id: &str)
    -> AppResult<Option<SubscriptionRecord>>;

    async fn list(&self) -> AppResult<Vec<SubscriptionRecord>>;
}

/// A verification result normalized for persistence, regardless of which
/// store and API shape it came from.
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    pub original_transaction_id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Epoch milliseconds.
    pub purchase_date: i64,
    /// Epoch milliseconds.
    pub expiration_date: Option<i64>,
    pub environment: StoreEnvironment,
    pub platform: Platform,
}

pub struct ReconciliationEngine {
    store: Arc<dyn SubscriptionStore>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Persist a successful verification as an active-at-verification-time
    /// snapshot of the lineage.
    pub async fn record_verification(
        &self,
        transaction: VerifiedTransaction,
    ) -> AppResult<SubscriptionRecord> {
        if transaction.original_transaction_id.is_empty() {
            return Err(AppError::InvalidInput(
                "originalTransactionId is required".to_string(),
            ));
        }

        let mut patch = RecordPatch::new(transaction.original_transaction_id);
        patch.transaction_id = Some(transaction.transaction_id);
        patch.product_id = Some(transaction.product_id);
        patch.purchase_date = Some(transaction.purchase_date);
        patch.expiration_date = transaction.expiration_date;
        patch.environment = Some(transaction.environment);
        patch.platform = Some(transaction.platform);
        patch.status = Some(SubscriptionStatus::Active);

        let record = self.store.upsert(patch).await?;
        tracing::info!(
            original_transaction_id = %record.original_transaction_id,
            platform = %record.platform,
            "Subscription saved"
        );
        Ok(record)
    }

    /// Apply one store notification to the lineage it references.
    ///
    /// Re-delivery is safe: the resulting record depends only on the
    /// notification itself, not on how many times it was applied.
    pub async fn apply_notification(
        &self,
        notification_type: &str,
        info: &TransactionClaims,
    ) -> AppResult<SubscriptionRecord> {
        let original_transaction_id = info
            .original_transaction_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::InvalidInput("originalTransactionId is required".to_string())
            })?;

        let mut patch = RecordPatch::new(original_transaction_id);
        patch.expiration_date = info.expires_date;
        patch.last_notification_type = Some(notification_type.to_string());
        patch.status = SubscriptionStatus::from_notification(notification_type);

        let record = match self.store.get(original_transaction_id).await? {
            Some(_) => {
                // The verification-time transaction id stays put; the
                // notification's id is recorded as the latest in the lineage.
                patch.latest_transaction_id = info.transaction_id.clone();
                let record = self.store.upsert(patch).await?;
                tracing::info!(
                    original_transaction_id,
                    notification_type,
                    "Subscription updated via webhook"
                );
                record
            }
            None => {
                tracing::info!(
                    original_transaction_id,
                    notification_type,
                    "Creating subscription from webhook"
                );
                patch.transaction_id = info.transaction_id.clone();
                patch.product_id = info.product_id.clone();
                patch.purchase_date = info.purchase_date;
                patch.environment = info.environment;
                patch.platform = Some(Platform::Apple);
                self.store.upsert(patch).await?
            }
        };
        Ok(record)
    }

    pub async fn list(&self) -> AppResult<Vec<SubscriptionRecord>> {
        self.store.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemorySubscriptionStore, create_test_claims};

    fn engine_with_store() -> (ReconciliationEngine, Arc<InMemorySubscriptionStore>) {
        let store = Arc::new(InMemorySubscriptionStore::new());
        (
            ReconciliationEngine::new(store.clone() as Arc<dyn SubscriptionStore>),
            store,
        )
    }

    fn test_transaction() -> VerifiedTransaction {
        VerifiedTransaction {
            original_transaction_id: "2000000000000001".to_string(),
            transaction_id: "2000000000000002".to_string(),
            product_id: "com.example.reader.monthly".to_string(),
            purchase_date: 1_700_000_000_000,
            expiration_date: Some(1_702_592_000_000),
            environment: StoreEnvironment::Sandbox,
            platform: Platform::Apple,
        }
    }

    #[tokio::test]
    async fn verification_creates_active_record() {
        let (engine, _) = engine_with_store();

        let record = engine.record_verification(test_transaction()).await.unwrap();

        assert_eq!(record.original_transaction_id, "2000000000000001");
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.platform, Platform::Apple);
        assert_eq!(record.expiration_date, Some(1_702_592_000_000));
    }

    #[tokio::test]
    async fn repeated_verifications_keep_one_record_per_lineage() {
        let (engine, _) = engine_with_store();

        engine.record_verification(test_transaction()).await.unwrap();
        let mut renewal = test_transaction();
        renewal.transaction_id = "2000000000000003".to_string();
        renewal.expiration_date = Some(1_705_184_000_000);
        engine.record_verification(renewal).await.unwrap();

        let records = engine.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_id, "2000000000000003");
        assert_eq!(records[0].expiration_date, Some(1_705_184_000_000));
    }

    #[tokio::test]
    async fn verification_without_lineage_key_is_rejected() {
        let (engine, store) = engine_with_store();

        let mut transaction = test_transaction();
        transaction.original_transaction_id = String::new();
        let err = engine.record_verification(transaction).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn notification_without_lineage_key_is_rejected() {
        let (engine, store) = engine_with_store();

        let claims = create_test_claims(|c| c.original_transaction_id = None);
        let err = engine
            .apply_notification("DID_RENEW", &claims)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn notification_on_existing_record_merges() {
        let (engine, _) = engine_with_store();
        engine.record_verification(test_transaction()).await.unwrap();

        let claims = create_test_claims(|c| {
            c.transaction_id = Some("2000000000000005".to_string());
            c.expires_date = Some(1_705_184_000_000);
        });
        let record = engine.apply_notification("DID_RENEW", &claims).await.unwrap();

        // Verification-time id kept, notification id recorded as latest.
        assert_eq!(record.transaction_id, "2000000000000002");
        assert_eq!(
            record.latest_transaction_id.as_deref(),
            Some("2000000000000005")
        );
        assert_eq!(record.expiration_date, Some(1_705_184_000_000));
        assert_eq!(record.last_notification_type.as_deref(), Some("DID_RENEW"));
        assert_eq!(record.product_id, "com.example.reader.monthly");
        assert_eq!(record.environment, StoreEnvironment::Sandbox);
    }

    #[tokio::test]
    async fn notification_without_expiry_preserves_stored_expiry() {
        let (engine, _) = engine_with_store();
        engine.record_verification(test_transaction()).await.unwrap();

        let claims = create_test_claims(|c| c.expires_date = None);
        let record = engine.apply_notification("EXPIRED", &claims).await.unwrap();

        assert_eq!(record.expiration_date, Some(1_702_592_000_000));
        assert_eq!(record.status, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn status_follows_the_transition_table() {
        let (engine, _) = engine_with_store();
        engine.record_verification(test_transaction()).await.unwrap();
        let claims = create_test_claims(|_| {});

        let record = engine.apply_notification("EXPIRED", &claims).await.unwrap();
        assert_eq!(record.status, SubscriptionStatus::Expired);

        let record = engine
            .apply_notification("DID_FAIL_TO_RENEW", &claims)
            .await
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::GracePeriod);

        let record = engine.apply_notification("DID_RENEW", &claims).await.unwrap();
        assert_eq!(record.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn unknown_notification_type_leaves_status_unchanged() {
        let (engine, _) = engine_with_store();
        engine.record_verification(test_transaction()).await.unwrap();
        let claims = create_test_claims(|_| {});

        engine.apply_notification("EXPIRED", &claims).await.unwrap();
        let record = engine
            .apply_notification("PRICE_INCREASE", &claims)
            .await
            .unwrap();

        assert_eq!(record.status, SubscriptionStatus::Expired);
        assert_eq!(
            record.last_notification_type.as_deref(),
            Some("PRICE_INCREASE")
        );
    }

    #[tokio::test]
    async fn notification_for_unknown_lineage_synthesizes_record() {
        let (engine, _) = engine_with_store();

        let claims = create_test_claims(|c| {
            c.original_transaction_id = Some("9999".to_string());
            c.environment = None;
        });
        let record = engine
            .apply_notification("SUBSCRIBED", &claims)
            .await
            .unwrap();

        assert_eq!(record.original_transaction_id, "9999");
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.platform, Platform::Apple);
        assert_eq!(record.environment, StoreEnvironment::Production);
        assert_eq!(record.last_notification_type.as_deref(), Some("SUBSCRIBED"));
    }

    #[tokio::test]
    async fn notification_application_is_idempotent() {
        let (engine, _) = engine_with_store();
        engine.record_verification(test_transaction()).await.unwrap();

        let claims = create_test_claims(|c| {
            c.transaction_id = Some("2000000000000005".to_string());
            c.expires_date = Some(1_705_184_000_000);
        });
        let first = engine.apply_notification("DID_RENEW", &claims).await.unwrap();
        let second = engine.apply_notification("DID_RENEW", &claims).await.unwrap();

        assert_eq!(first.status, second.status);
        assert_eq!(first.transaction_id, second.transaction_id);
        assert_eq!(first.latest_transaction_id, second.latest_transaction_id);
        assert_eq!(first.expiration_date, second.expiration_date);
        assert_eq!(first.last_notification_type, second.last_notification_type);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }
}
