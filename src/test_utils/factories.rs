//! Factories for claims and signed test tokens.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::application::token_codec::{
    NotificationData, NotificationPayload, TransactionClaims,
};
use crate::domain::entities::subscription::StoreEnvironment;

/// Sign claims with HS256. The codec never checks signatures, so any key and
/// algorithm produce a decodable fixture.
pub fn sign_test_token<T: Serialize>(claims: &T) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(b"shh_secret"),
    )
    .unwrap()
}

/// Transaction claims for a sandbox monthly subscription; customize via the
/// mutator.
pub fn create_test_claims(mutator: impl FnOnce(&mut TransactionClaims)) -> TransactionClaims {
    let mut claims = TransactionClaims {
        original_transaction_id: Some("2000000000000001".to_string()),
        transaction_id: Some("2000000000000002".to_string()),
        web_order_line_item_id: Some("3000000000000001".to_string()),
        product_id: Some("com.example.reader.monthly".to_string()),
        purchase_date: Some(1_700_000_000_000),
        expires_date: Some(1_702_592_000_000),
        environment: Some(StoreEnvironment::Sandbox),
    };
    mutator(&mut claims);
    claims
}

/// A complete `signedPayload` as delivered by App Store Server Notifications:
/// the transaction claims signed as the inner JWS, wrapped and signed again.
pub fn signed_notification(notification_type: &str, claims: &TransactionClaims) -> String {
    let signed_transaction_info = sign_test_token(claims);
    let payload = NotificationPayload {
        notification_type: notification_type.to_string(),
        subtype: None,
        notification_uuid: Some("uuid-123-456".to_string()),
        data: NotificationData {
            bundle_id: Some("com.example.reader".to_string()),
            bundle_version: Some("1.0.0".to_string()),
            environment: claims.environment,
            signed_transaction_info: Some(signed_transaction_info),
            signed_renewal_info: None,
        },
        version: Some("2.0".to_string()),
    };
    sign_test_token(&payload)
}
