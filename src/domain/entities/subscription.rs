use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Store environment a transaction was made in, as reported by the stores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
#[derive(Default)]
pub enum StoreEnvironment {
    Sandbox,
    #[default]
    Production,
}

impl StoreEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, StoreEnvironment::Production)
    }

    pub fn is_sandbox(&self) -> bool {
        matches!(self, StoreEnvironment::Sandbox)
    }
}

/// Verification path a record came through.
///
/// `AppleLegacy` marks records built from the legacy `verifyReceipt` flow,
/// whose numeric fields arrive as string-encoded milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[derive(Default)]
pub enum Platform {
    #[default]
    Apple,
    AppleLegacy,
    Android,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[derive(Default)]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Expired,
    GracePeriod,
}

impl SubscriptionStatus {
    /// Returns true if the lineage currently grants entitlement.
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }

    /// Returns true if a renewal failed but the store has not yet expired the lineage.
    pub fn is_grace_period(&self) -> bool {
        matches!(self, SubscriptionStatus::GracePeriod)
    }

    /// Status transition for an App Store Server Notification type.
    ///
    /// The transition depends only on the notification type, never on the
    /// prior status, so re-delivered notifications land on the same state.
    /// Types outside the table return `None` (status left unchanged).
    pub fn from_notification(notification_type: &str) -> Option<Self> {
        match notification_type {
            "DID_RENEW" | "SUBSCRIBED" => Some(SubscriptionStatus::Active),
            "EXPIRED" => Some(SubscriptionStatus::Expired),
            "DID_FAIL_TO_RENEW" => Some(SubscriptionStatus::GracePeriod),
            _ => None,
        }
    }
}

/// One entry per purchase lineage, keyed by `originalTransactionId`.
///
/// Serialized in camelCase so the persisted document matches the wire shape
/// the clients already consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub original_transaction_id: String,
    pub transaction_id: String,
    pub latest_transaction_id: Option<String>,
    pub product_id: String,
    /// Epoch milliseconds.
    pub purchase_date: i64,
    /// Epoch milliseconds. Absent when no source has reported one yet.
    pub expiration_date: Option<i64>,
    pub environment: StoreEnvironment,
    pub platform: Platform,
    pub status: SubscriptionStatus,
    pub last_notification_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial record for upserts. `Some` fields win over stored values, `None`
/// fields preserve them; only the lineage key is mandatory.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub original_transaction_id: String,
    pub transaction_id: Option<String>,
    pub latest_transaction_id: Option<String>,
    pub product_id: Option<String>,
    pub purchase_date: Option<i64>,
    pub expiration_date: Option<i64>,
    pub environment: Option<StoreEnvironment>,
    pub platform: Option<Platform>,
    pub status: Option<SubscriptionStatus>,
    pub last_notification_type: Option<String>,
}

impl RecordPatch {
    pub fn new(original_transaction_id: impl Into<String>) -> Self {
        Self {
            original_transaction_id: original_transaction_id.into(),
            ..Default::default()
        }
    }

    /// Field-by-field merge into an existing record.
    ///
    /// `createdAt` and the lineage key are never touched; `updatedAt` only
    /// moves forward.
    pub fn apply_to(&self, record: &mut SubscriptionRecord, now: DateTime<Utc>) {
        debug_assert_eq!(record.original_transaction_id, self.original_transaction_id);

        if let Some(transaction_id) = &self.transaction_id {
            record.transaction_id = transaction_id.clone();
        }
        if let Some(latest_transaction_id) = &self.latest_transaction_id {
            record.latest_transaction_id = Some(latest_transaction_id.clone());
        }
        if let Some(product_id) = &self.product_id {
            record.product_id = product_id.clone();
        }
        if let Some(purchase_date) = self.purchase_date {
            record.purchase_date = purchase_date;
        }
        if let Some(expiration_date) = self.expiration_date {
            record.expiration_date = Some(expiration_date);
        }
        if let Some(environment) = self.environment {
            record.environment = environment;
        }
        if let Some(platform) = self.platform {
            record.platform = platform;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(last_notification_type) = &self.last_notification_type {
            record.last_notification_type = Some(last_notification_type.clone());
        }
        record.updated_at = now.max(record.updated_at);
    }

    /// Materialize a brand-new record, filling creation defaults for fields
    /// the patch leaves unset.
    pub fn into_record(self, now: DateTime<Utc>) -> SubscriptionRecord {
        SubscriptionRecord {
            transaction_id: self
                .transaction_id
                .unwrap_or_else(|| self.original_transaction_id.clone()),
            original_transaction_id: self.original_transaction_id,
            latest_transaction_id: self.latest_transaction_id,
            product_id: self.product_id.unwrap_or_default(),
            purchase_date: self.purchase_date.unwrap_or_default(),
            expiration_date: self.expiration_date,
            environment: self.environment.unwrap_or_default(),
            platform: self.platform.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            last_notification_type: self.last_notification_type,
            created_at: now,
            updated_at: now,
        }
    }
}
