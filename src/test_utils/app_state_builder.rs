//! Test app state builder for HTTP-level integration testing.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::ports::store_gateway::{AppleStoreGateway, GooglePlayGateway},
    application::use_cases::reconciliation::SubscriptionStore,
    application::use_cases::verification::VerificationUseCases,
    domain::entities::subscription::StoreEnvironment,
    infra::config::AppConfig,
    test_utils::{InMemorySubscriptionStore, MockAppleGateway, MockGoogleGateway},
};

/// Builder for creating `AppState` backed by the in-memory store and mock
/// gateways. Keep handles from the accessors to stage responses and inspect
/// persisted records.
pub struct TestAppStateBuilder {
    store: Arc<InMemorySubscriptionStore>,
    apple: Arc<MockAppleGateway>,
    google: Arc<MockGoogleGateway>,
    environment: StoreEnvironment,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemorySubscriptionStore::new()),
            apple: Arc::new(MockAppleGateway::new()),
            google: Arc::new(MockGoogleGateway::new()),
            environment: StoreEnvironment::Sandbox,
        }
    }

    pub fn with_environment(mut self, environment: StoreEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn store(&self) -> Arc<InMemorySubscriptionStore> {
        self.store.clone()
    }

    pub fn apple(&self) -> Arc<MockAppleGateway> {
        self.apple.clone()
    }

    pub fn google(&self) -> Arc<MockGoogleGateway> {
        self.google.clone()
    }

    pub fn build(self) -> AppState {
        let verification_use_cases = VerificationUseCases::new(
            self.apple.clone() as Arc<dyn AppleStoreGateway>,
            self.google.clone() as Arc<dyn GooglePlayGateway>,
            self.store.clone() as Arc<dyn SubscriptionStore>,
            self.environment,
        );

        AppState {
            config: Arc::new(test_config(self.environment)),
            verification_use_cases: Arc::new(verification_use_cases),
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config(environment: StoreEnvironment) -> AppConfig {
    AppConfig {
        environment,
        bundle_id: "com.example.reader".to_string(),
        issuer_id: "test-issuer".to_string(),
        key_id: "TESTKEY123".to_string(),
        private_key: SecretString::new("test-private-key".into()),
        asc_issuer_id: None,
        asc_key_id: None,
        asc_private_key: None,
        shared_secret: None,
        google_client_email: None,
        google_private_key: None,
        db_file: PathBuf::from("subscriptions.json"),
        bind_addr: "127.0.0.1:3000".parse().unwrap(),
        cors_origin: HeaderValue::from_static("*"),
    }
}
