//! Google Play Developer API gateway, authenticated through the OAuth2
//! service-account JWT-bearer flow.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::store_gateway::GooglePlayGateway,
};

const PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const PUBLISHER_API_BASE: &str = "https://androidpublisher.googleapis.com/androidpublisher/v3";

#[derive(Clone)]
pub struct GooglePlayCredentials {
    pub client_email: String,
    pub private_key: SecretString,
}

pub struct GooglePlayClient {
    client: Client,
    package_name: String,
    credentials: Option<GooglePlayCredentials>,
    cached_token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

#[derive(Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

impl GooglePlayClient {
    pub fn new(package_name: String, credentials: Option<GooglePlayCredentials>) -> Self {
        Self {
            client: Client::new(),
            package_name,
            credentials,
            cached_token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> AppResult<String> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(AppError::ProviderNotConfigured("Google Play"))?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        {
            let cached = self.cached_token.lock().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > now + 60 {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let claims = ServiceAccountClaims {
            iss: &credentials.client_email,
            scope: PUBLISHER_SCOPE,
            aud: TOKEN_URI,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(credentials.private_key.expose_secret().as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid Google service account key: {e}")))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AppError::Internal(format!("Failed to sign Google assertion: {e}")))?;

        let response = self
            .client
            .post(TOKEN_URI)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Google token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Google token request failed: {status} - {body}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid Google token response: {e}")))?;

        let mut cached = self.cached_token.lock().await;
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    async fn get_json(&self, url: &str) -> AppResult<serde_json::Value> {
        let token = self.access_token().await?;
        tracing::debug!(%url, "Google Play request");
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Google Play request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("API error: {status} - {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid Google Play response: {e}")))
    }
}

#[async_trait]
impl GooglePlayGateway for GooglePlayClient {
    async fn verify_product(
        &self,
        product_id: &str,
        token: &str,
    ) -> AppResult<serde_json::Value> {
        tracing::info!(product_id, "Verifying Android product");
        let url = format!(
            "{PUBLISHER_API_BASE}/applications/{}/purchases/products/{}/tokens/{}",
            self.package_name, product_id, token
        );
        self.get_json(&url).await
    }

    async fn verify_subscription(
        &self,
        subscription_id: &str,
        token: &str,
    ) -> AppResult<serde_json::Value> {
        tracing::info!(subscription_id, "Verifying Android subscription");
        let url = format!(
            "{PUBLISHER_API_BASE}/applications/{}/purchases/subscriptions/{}/tokens/{}",
            self.package_name, subscription_id, token
        );
        self.get_json(&url).await
    }
}
