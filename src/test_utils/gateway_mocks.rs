//! Mock store gateways with canned responses.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::store_gateway::{AppleStoreGateway, GooglePlayGateway},
};

#[derive(Default)]
pub struct MockAppleGateway {
    pub transactions: Mutex<HashMap<String, serde_json::Value>>,
    pub receipt_response: Mutex<Option<serde_json::Value>>,
    pub group_response: Mutex<Option<serde_json::Value>>,
}

impl MockAppleGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_transaction(&self, transaction_id: &str, response: serde_json::Value) {
        self.transactions
            .lock()
            .unwrap()
            .insert(transaction_id.to_string(), response);
    }

    pub fn set_receipt_response(&self, response: serde_json::Value) {
        *self.receipt_response.lock().unwrap() = Some(response);
    }

    pub fn set_group_response(&self, response: serde_json::Value) {
        *self.group_response.lock().unwrap() = Some(response);
    }
}

#[async_trait]
impl AppleStoreGateway for MockAppleGateway {
    async fn fetch_transaction(&self, transaction_id: &str) -> AppResult<serde_json::Value> {
        self.transactions
            .lock()
            .unwrap()
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| {
                AppError::Upstream(format!(
                    "API error: 404 Not Found - no transaction {transaction_id}"
                ))
            })
    }

    async fn verify_legacy_receipt(&self, _receipt_data: &str) -> AppResult<serde_json::Value> {
        self.receipt_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Upstream("Receipt verification failed: 503".to_string()))
    }

    async fn fetch_subscription_group(&self, group_id: &str) -> AppResult<serde_json::Value> {
        self.group_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                AppError::Upstream(format!("API error: 404 Not Found - no group {group_id}"))
            })
    }
}

#[derive(Default)]
pub struct MockGoogleGateway {
    pub subscriptions: Mutex<HashMap<(String, String), serde_json::Value>>,
    pub products: Mutex<HashMap<(String, String), serde_json::Value>>,
}

impl MockGoogleGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_subscription(&self, subscription_id: &str, token: &str, response: serde_json::Value) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert((subscription_id.to_string(), token.to_string()), response);
    }

    pub fn set_product(&self, product_id: &str, token: &str, response: serde_json::Value) {
        self.products
            .lock()
            .unwrap()
            .insert((product_id.to_string(), token.to_string()), response);
    }
}

#[async_trait]
impl GooglePlayGateway for MockGoogleGateway {
    async fn verify_product(
        &self,
        product_id: &str,
        token: &str,
    ) -> AppResult<serde_json::Value> {
        self.products
            .lock()
            .unwrap()
            .get(&(product_id.to_string(), token.to_string()))
            .cloned()
            .ok_or_else(|| {
                AppError::Upstream(format!("API error: 404 Not Found - no product {product_id}"))
            })
    }

    async fn verify_subscription(
        &self,
        subscription_id: &str,
        token: &str,
    ) -> AppResult<serde_json::Value> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(&(subscription_id.to_string(), token.to_string()))
            .cloned()
            .ok_or_else(|| {
                AppError::Upstream(format!(
                    "API error: 404 Not Found - no subscription {subscription_id}"
                ))
            })
    }
}
