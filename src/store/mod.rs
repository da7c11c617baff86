pub mod supabase;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A session row matched by the expiry query. Only the columns the cleanup
/// needs are selected; `created_at` is the filter column and is not re-read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiredSession {
    pub session_id: String,
    pub storage_prefix: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("api error: status={status}, message={message}")]
    Api { status: u16, message: String },
}

/// Row-level access to the `sessions` table.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All sessions with `created_at` strictly before `cutoff`.
    async fn expired_sessions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ExpiredSession>, StoreError>;

    /// Batch-delete rows by session id. Deleting an id with no matching row
    /// is a no-op, which keeps overlapping cleanup runs benign.
    async fn delete_sessions(&self, session_ids: &[String]) -> Result<(), StoreError>;
}

/// Object-level access to the storage bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// One page of object names directly under `prefix`. Callers page with
    /// `limit`/`offset`; a page shorter than `limit` is the last one.
    async fn list_objects(
        &self,
        prefix: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Batch-remove objects by full path (`prefix/name`).
    async fn remove_objects(&self, paths: &[String]) -> Result<(), StoreError>;
}
