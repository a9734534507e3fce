//! File-backed subscription store.
//!
//! One JSON document holds every record. Write volume is a handful of
//! webhook deliveries per day, so each mutation reads the full document,
//! merges one record and rewrites the file. Mutations are serialized behind
//! a single async lock; reads take lock-free snapshots.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::reconciliation::SubscriptionStore,
    domain::entities::subscription::{RecordPatch, SubscriptionRecord},
};

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        tracing::info!(path = %path.display(), "Subscription store file");
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// A missing, empty or unreadable document reads as an empty store; the
    /// service stays available and the next successful write repairs it.
    async fn read_all(&self) -> Vec<SubscriptionRecord> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to read subscription store, treating as empty"
                );
                return Vec::new();
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Vec::new();
        }

        match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Subscription store is corrupt, treating as empty"
                );
                Vec::new()
            }
        }
    }

    /// Stage-then-rename commit: a failed write leaves the previous document
    /// untouched, and readers never observe a partially written file.
    async fn write_all(&self, records: &[SubscriptionRecord]) -> AppResult<()> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|err| AppError::Persistence(format!("serialize store: {err}")))?;

        let staged = self.path.with_extension("json.tmp");
        tokio::fs::write(&staged, &json)
            .await
            .map_err(|err| AppError::Persistence(format!("stage store write: {err}")))?;
        tokio::fs::rename(&staged, &self.path)
            .await
            .map_err(|err| AppError::Persistence(format!("commit store write: {err}")))?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for JsonFileStore {
    async fn upsert(&self, patch: RecordPatch) -> AppResult<SubscriptionRecord> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_all().await;
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

        self.write_all(&records).await?;
        Ok(record)
    }

    async fn get(
        &self,
        original_transaction_id: &str,
    ) -> AppResult<Option<SubscriptionRecord>> {
        Ok(self
            .read_all()
            .await
            .into_iter()
            .find(|r| r.original_transaction_id == original_transaction_id))
    }

    async fn list(&self) -> AppResult<Vec<SubscriptionRecord>> {
        Ok(self.read_all().await)
    }
}
