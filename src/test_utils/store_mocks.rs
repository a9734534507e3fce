//! In-memory implementation of the subscription store.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    app_error::AppResult,
    application::use_cases::reconciliation::SubscriptionStore,
    domain::entities::subscription::{RecordPatch, SubscriptionRecord},
};

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    pub records: Mutex<Vec<SubscriptionRecord>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SubscriptionRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn upsert(&self, patch: RecordPatch) -> AppResult<SubscriptionRecord> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let record = match records
            .iter_mut()
            .find(|r| r.original_transaction_id == patch.original_transaction_id)
        {
            Some(existing) => {
                patch.apply_to(existing, now);
                existing.clone()
            }
            None => {
                let record = patch.into_record(now);
                records.push(record.clone());
                record
            }
        };
        Ok(record)
    }

    async fn get(
        &self,
        original_transaction_id: &str,
    ) -> AppResult<Option<SubscriptionRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.original_transaction_id == original_transaction_id)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<SubscriptionRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }
}
