use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::store::{ObjectStore, SessionStore, StoreError};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub deleted_objects: u64,
    pub deleted_sessions: u64,
}

/// Two-phase deletion of expired sessions: storage objects first, rows
/// second. The phases are not transactional — if object deletion fails for
/// a session, its row is still deleted in the same run and the objects are
/// orphaned until a later sweep. Overlapping runs are benign because both
/// phases are no-ops on already-deleted targets.
pub struct CleanupEngine {
    sessions: Arc<dyn SessionStore>,
    objects: Arc<dyn ObjectStore>,
    list_page_size: usize,
}

impl CleanupEngine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        objects: Arc<dyn ObjectStore>,
        list_page_size: usize,
    ) -> Self {
        Self {
            sessions,
            objects,
            list_page_size: list_page_size.max(1),
        }
    }

    /// Delete all sessions created more than `hours` hours ago, together
    /// with their stored objects. Only the session query and the final row
    /// delete are fatal; per-session object failures are logged and
    /// swallowed, lowering `deleted_objects` but never `deleted_sessions`.
    pub async fn run(&self, hours: u32) -> Result<CleanupSummary, StoreError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(hours));

        let expired = self.sessions.expired_sessions(cutoff).await?;
        if expired.is_empty() {
            tracing::debug!(%cutoff, "No expired sessions");
            return Ok(CleanupSummary::default());
        }

        let mut deleted_objects = 0u64;
        for session in &expired {
            deleted_objects += self
                .purge_objects(&session.session_id, &session.storage_prefix)
                .await;
        }

        let ids: Vec<String> = expired.iter().map(|s| s.session_id.clone()).collect();
        self.sessions.delete_sessions(&ids).await?;

        Ok(CleanupSummary {
            deleted_objects,
            deleted_sessions: ids.len() as u64,
        })
    }

    /// Remove every object under `prefix`, paging until a short page.
    /// Returns the number of objects removed; listing or removal failures
    /// are logged and count as zero for this session.
    async fn purge_objects(&self, session_id: &str, prefix: &str) -> u64 {
        let mut paths = Vec::new();
        let mut offset = 0usize;
        loop {
            let page = match self.objects.list_objects(prefix, self.list_page_size, offset).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        session_id,
                        prefix,
                        error = %e,
                        "Object listing failed, skipping session objects"
                    );
                    return 0;
                }
            };
            let page_len = page.len();
            paths.extend(page.into_iter().map(|name| format!("{prefix}/{name}")));
            if page_len < self.list_page_size {
                break;
            }
            offset += page_len;
        }

        if paths.is_empty() {
            return 0;
        }

        match self.objects.remove_objects(&paths).await {
            Ok(()) => paths.len() as u64,
            Err(e) => {
                tracing::warn!(
                    session_id,
                    prefix,
                    count = paths.len(),
                    error = %e,
                    "Object removal failed, objects left behind"
                );
                0
            }
        }
    }
}
