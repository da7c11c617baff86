use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::config::SupabaseConfig;
use crate::store::{ExpiredSession, ObjectStore, SessionStore, StoreError};

const SESSIONS_TABLE: &str = "sessions";

/// Client for the Supabase PostgREST and Storage APIs, authenticated with
/// the service-role key. Constructed once at startup from explicit config;
/// nothing here reads the process environment.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    service_role_key: String,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct StorageEntry {
    name: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path)
    }

    /// PostgREST `in.(...)` filter value. Values are double-quoted so ids
    /// containing commas or parentheses do not break the list syntax.
    fn in_filter(ids: &[String]) -> String {
        let quoted: Vec<String> = ids
            .iter()
            .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
            .collect();
        format!("in.({})", quoted.join(","))
    }
}

#[async_trait]
impl SessionStore for SupabaseStore {
    async fn expired_sessions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ExpiredSession>, StoreError> {
        let cutoff_filter = format!(
            "lt.{}",
            cutoff.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let resp = self
            .authed(self.http.get(self.rest_url(SESSIONS_TABLE)))
            .query(&[
                ("select", "session_id,storage_prefix"),
                ("created_at", cutoff_filter.as_str()),
            ])
            .send()
            .await?;
        let rows = Self::check(resp).await?.json::<Vec<ExpiredSession>>().await?;
        Ok(rows)
    }

    async fn delete_sessions(&self, session_ids: &[String]) -> Result<(), StoreError> {
        if session_ids.is_empty() {
            return Ok(());
        }
        let resp = self
            .authed(self.http.delete(self.rest_url(SESSIONS_TABLE)))
            .query(&[("session_id", Self::in_filter(session_ids))])
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn list_objects(
        &self,
        prefix: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>, StoreError> {
        let url = self.storage_url(&format!("object/list/{}", self.bucket));
        let resp = self
            .authed(self.http.post(url))
            .json(&json!({
                "prefix": prefix,
                "limit": limit,
                "offset": offset,
            }))
            .send()
            .await?;
        let entries = Self::check(resp).await?.json::<Vec<StorageEntry>>().await?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    async fn remove_objects(&self, paths: &[String]) -> Result<(), StoreError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.storage_url(&format!("object/{}", self.bucket));
        let resp = self
            .authed(self.http.delete(url))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
