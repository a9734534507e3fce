//! Apple gateways: App Store Server API, legacy `verifyReceipt` and the App
//! Store Connect API, authenticated with ES256 JWTs.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::store_gateway::AppleStoreGateway,
    domain::entities::subscription::StoreEnvironment,
};

const APPSTORE_AUDIENCE: &str = "appstoreconnect-v1";
const ASC_API_BASE: &str = "https://api.appstoreconnect.apple.com";

#[derive(Clone)]
pub struct AppStoreCredentials {
    pub issuer_id: String,
    pub key_id: String,
    pub private_key: SecretString,
}

pub struct AppStoreClient {
    client: Client,
    environment: StoreEnvironment,
    bundle_id: String,
    server_api: AppStoreCredentials,
    /// Separate key pair; the Connect API rejects Server API tokens.
    connect_api: Option<AppStoreCredentials>,
    shared_secret: Option<SecretString>,
}

#[derive(Serialize)]
struct ApiClaims<'a> {
    iss: &'a str,
    iat: i64,
    exp: i64,
    aud: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bid: Option<&'a str>,
}

impl AppStoreClient {
    pub fn new(
        environment: StoreEnvironment,
        bundle_id: String,
        server_api: AppStoreCredentials,
        connect_api: Option<AppStoreCredentials>,
        shared_secret: Option<SecretString>,
    ) -> Self {
        Self {
            client: Client::new(),
            environment,
            bundle_id,
            server_api,
            connect_api,
            shared_secret,
        }
    }

    fn base_url(&self) -> &'static str {
        if self.environment.is_production() {
            "https://api.storekit.itunes.apple.com"
        } else {
            "https://api.storekit-sandbox.itunes.apple.com"
        }
    }

    fn verify_receipt_url(&self) -> &'static str {
        if self.environment.is_production() {
            "https://buy.itunes.apple.com/verifyReceipt"
        } else {
            "https://sandbox.itunes.apple.com/verifyReceipt"
        }
    }

    fn auth_token(
        &self,
        credentials: &AppStoreCredentials,
        ttl: Duration,
        include_bundle_id: bool,
    ) -> AppResult<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = ApiClaims {
            iss: &credentials.issuer_id,
            iat: now,
            exp: now + ttl.whole_seconds(),
            aud: APPSTORE_AUDIENCE,
            bid: include_bundle_id.then_some(self.bundle_id.as_str()),
        };

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(credentials.key_id.clone());

        let key = EncodingKey::from_ec_pem(credentials.private_key.expose_secret().as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid App Store private key: {e}")))?;
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| AppError::Internal(format!("Failed to sign App Store token: {e}")))
    }

    async fn get_json(&self, url: &str, token: &str) -> AppResult<serde_json::Value> {
        tracing::debug!(%url, "App Store request");
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("App Store request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("API error: {status} - {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid App Store response: {e}")))
    }
}

#[async_trait]
impl AppleStoreGateway for AppStoreClient {
    async fn fetch_transaction(&self, transaction_id: &str) -> AppResult<serde_json::Value> {
        // Server API tokens may live up to one hour.
        let token = self.auth_token(&self.server_api, Duration::hours(1), true)?;
        let url = format!("{}/inApps/v1/transactions/{}", self.base_url(), transaction_id);
        self.get_json(&url, &token).await
    }

    async fn verify_legacy_receipt(&self, receipt_data: &str) -> AppResult<serde_json::Value> {
        if self.shared_secret.is_none() {
            tracing::warn!(
                "SHARED_SECRET is not set; auto-renewable receipt verification may fail"
            );
        }

        let body = serde_json::json!({
            "receipt-data": receipt_data,
            "password": self
                .shared_secret
                .as_ref()
                .map(|secret| secret.expose_secret().to_string())
                .unwrap_or_default(),
            "exclude-old-transactions": true,
        });

        let url = self.verify_receipt_url();
        tracing::debug!(%url, "Verifying receipt");
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Receipt verification failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Receipt verification failed: {status}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid verifyReceipt response: {e}")))
    }

    async fn fetch_subscription_group(&self, group_id: &str) -> AppResult<serde_json::Value> {
        let connect = self
            .connect_api
            .as_ref()
            .ok_or(AppError::ProviderNotConfigured("App Store Connect"))?;
        // The Connect API caps token lifetime at 20 minutes; stay well under
        // it, and the bundle-id claim must be absent.
        let token = self.auth_token(connect, Duration::minutes(5), false)?;
        let url = format!("{ASC_API_BASE}/v1/subscriptionGroups/{group_id}/subscriptions");
        self.get_json(&url, &token).await
    }
}
