use crate::cleanup::CleanupEngine;

pub async fn run(engine: &CleanupEngine, hours: u32) {
    tracing::debug!(hours, "session_cleanup: start");
    match engine.run(hours).await {
        Ok(summary) => tracing::info!(
            deleted_objects = summary.deleted_objects,
            deleted_sessions = summary.deleted_sessions,
            "session_cleanup: done"
        ),
        Err(e) => tracing::error!(error=%e, "session_cleanup failed"),
    }
}
