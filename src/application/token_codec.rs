//! Decode-only JWS codec.
//!
//! The stores sign transaction and notification payloads as JWS tokens.
//! This service only needs the claims, so decoding skips signature
//! verification entirely (the algorithm is taken from the token header and
//! the key material is never consulted). Malformed input yields `None`,
//! never a panic.

use std::collections::HashSet;

use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::domain::entities::subscription::StoreEnvironment;

/// Claims of a signed transaction token (`signedTransactionInfo`).
///
/// Every field is optional: the stores add claims over time and a decode
/// must not fail on payloads richer or poorer than this struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionClaims {
    pub original_transaction_id: Option<String>,
    pub transaction_id: Option<String>,
    pub web_order_line_item_id: Option<String>,
    pub product_id: Option<String>,
    /// Epoch milliseconds.
    pub purchase_date: Option<i64>,
    /// Epoch milliseconds.
    pub expires_date: Option<i64>,
    pub environment: Option<StoreEnvironment>,
}

/// Outer payload of an App Store Server Notification v2 (`signedPayload`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPayload {
    pub notification_type: String,
    pub subtype: Option<String>,
    #[serde(rename = "notificationUUID")]
    pub notification_uuid: Option<String>,
    pub data: NotificationData,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationData {
    pub bundle_id: Option<String>,
    pub bundle_version: Option<String>,
    pub environment: Option<StoreEnvironment>,
    pub signed_transaction_info: Option<String>,
    pub signed_renewal_info: Option<String>,
}

/// Decode a JWS token's claims without verifying its signature.
///
/// Returns `None` for anything that is not a structurally valid token whose
/// claims deserialize into `T`.
pub fn decode<T: DeserializeOwned>(token: &str) -> Option<T> {
    let header = jsonwebtoken::decode_header(token).ok()?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    // Transaction claims carry no `exp`.
    validation.required_spec_claims = HashSet::new();

    // Key material is ignored once signature validation is disabled.
    jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(b"decode-only"), &validation)
        .ok()
        .map(|data| data.claims)
}
