use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

use crate::domain::entities::subscription::StoreEnvironment;

pub struct AppConfig {
    /// Which App Store environment this deployment talks to.
    pub environment: StoreEnvironment,
    /// App bundle id; doubles as the Google Play package name.
    pub bundle_id: String,
    // App Store Server API credentials.
    pub issuer_id: String,
    pub key_id: String,
    pub private_key: SecretString,
    // App Store Connect API credentials (subscription-group listing only).
    pub asc_issuer_id: Option<String>,
    pub asc_key_id: Option<String>,
    pub asc_private_key: Option<SecretString>,
    /// Shared secret for legacy `verifyReceipt` calls.
    pub shared_secret: Option<SecretString>,
    // Google Play service account.
    pub google_client_email: Option<String>,
    pub google_private_key: Option<SecretString>,
    /// Path of the subscription store document.
    pub db_file: PathBuf,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = std::env::var("ENVIRONMENT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(StoreEnvironment::Production);

        let issuer_id: String = get_env("ISSUER_ID");
        let key_id: String = get_env("KEY_ID");
        let bundle_id: String = get_env("BUNDLE_ID");
        let private_key =
            SecretString::new(unescape_newlines(&get_env::<String>("PRIVATE_KEY")).into());

        let asc_issuer_id = std::env::var("ASC_ISSUER_ID").ok();
        let asc_key_id = std::env::var("ASC_KEY_ID").ok();
        let asc_private_key = std::env::var("ASC_PRIVATE_KEY")
            .ok()
            .map(|raw| SecretString::new(unescape_newlines(&raw).into()));

        let shared_secret = std::env::var("SHARED_SECRET")
            .ok()
            .map(|raw| SecretString::new(raw.into()));

        let google_client_email = std::env::var("GOOGLE_CLIENT_EMAIL").ok();
        let google_private_key = std::env::var("GOOGLE_PRIVATE_KEY")
            .ok()
            .map(|raw| SecretString::new(unescape_newlines(&raw).into()));

        let db_file: PathBuf = get_env_default("DB_FILE", PathBuf::from("subscriptions.json"));
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3000".parse().unwrap());
        let cors_origin: HeaderValue = get_env_default("CORS_ORIGIN", String::from("*"))
            .parse()
            .expect("CORS_ORIGIN must be a valid header value");

        Self {
            environment,
            bundle_id,
            issuer_id,
            key_id,
            private_key,
            asc_issuer_id,
            asc_key_id,
            asc_private_key,
            shared_secret,
            google_client_email,
            google_private_key,
            db_file,
            bind_addr,
            cors_origin,
        }
    }
}

/// Env files carry PEM keys with literal `\n` sequences.
fn unescape_newlines(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
