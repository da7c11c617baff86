pub mod session_cleanup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::cleanup::CleanupEngine;
use crate::config::{CleanupConfig, WorkerConfig};

/// Timeout for individual worker invocations (5 minutes).
const WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    SessionCleanup,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionCleanup => "session_cleanup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: &'static str,
    pub enabled: bool,
}

pub struct WorkerManager {
    engine: Arc<CleanupEngine>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
    cleanup: CleanupConfig,
}

impl WorkerManager {
    pub fn new(
        engine: Arc<CleanupEngine>,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
        cleanup: &CleanupConfig,
    ) -> Self {
        Self {
            engine,
            shutdown_rx,
            config: config.clone(),
            cleanup: cleanup.clone(),
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        vec![JobSpec {
            name: WorkerName::SessionCleanup,
            cron: "0 0 * * * *",
            enabled: true,
        }]
    }

    /// Start the worker scheduler. Returns an error if the scheduler cannot
    /// be created or started.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;

        self.register_jobs(&scheduler).await;

        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            "Worker manager shutting down, draining for {}s",
            DRAIN_TIMEOUT.as_secs()
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        for spec in &self.planned_jobs() {
            if !spec.enabled {
                tracing::info!(name = spec.name.as_str(), "Skipping disabled worker");
                continue;
            }

            let name_str = spec.name.as_str();

            match spec.name {
                WorkerName::SessionCleanup => {
                    let engine = self.engine.clone();
                    let hours = self.cleanup.default_window_hours;
                    add_job(scheduler, spec.cron, name_str, move || {
                        let engine = engine.clone();
                        async move {
                            session_cleanup::run(&engine, hours).await;
                        }
                    })
                    .await;
                }
            }
            tracing::info!(name = name_str, cron = spec.cron, "Registered worker");
        }
    }
}

/// Add a job to the scheduler with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(scheduler: &JobScheduler, cron: &str, name: &'static str, mut run: F)
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                worker = name,
                "Skipping worker invocation: previous run still in progress"
            );
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            match tokio::time::timeout(WORKER_TIMEOUT, fut).await {
                Ok(()) => {}
                Err(_) => {
                    tracing::error!(
                        worker = name,
                        timeout_secs = WORKER_TIMEOUT.as_secs(),
                        "Worker timed out"
                    );
                }
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error=%err, cron, worker = name, "Failed to add worker job");
            }
        }
        Err(err) => tracing::error!(error=%err, cron, worker = name, "Failed to create worker job"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use crate::config::{CleanupConfig, WorkerConfig};
    use crate::store::memory::MemoryStore;

    use super::*;

    fn test_engine() -> Arc<CleanupEngine> {
        let store = Arc::new(MemoryStore::new());
        Arc::new(CleanupEngine::new(store.clone(), store, 1000))
    }

    fn cleanup_cfg() -> CleanupConfig {
        CleanupConfig {
            default_window_hours: 24,
            list_page_size: 1000,
        }
    }

    #[tokio::test]
    async fn leader_switch_controls_job_registration() {
        let (tx, _) = broadcast::channel(2);
        let cfg = WorkerConfig { is_leader: false };

        let manager = WorkerManager::new(test_engine(), tx.subscribe(), &cfg, &cleanup_cfg());
        assert!(manager.planned_jobs().is_empty());
    }

    #[tokio::test]
    async fn leader_plans_hourly_session_cleanup() {
        let (tx, _) = broadcast::channel(2);
        let cfg = WorkerConfig { is_leader: true };

        let manager = WorkerManager::new(test_engine(), tx.subscribe(), &cfg, &cleanup_cfg());
        let jobs = manager.planned_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, WorkerName::SessionCleanup);
        assert_eq!(jobs[0].cron, "0 0 * * * *");
        assert!(jobs[0].enabled);
    }

    #[tokio::test]
    async fn non_leader_start_is_non_panicking() {
        let (tx, _) = broadcast::channel(2);
        let cfg = WorkerConfig { is_leader: false };

        let manager = WorkerManager::new(test_engine(), tx.subscribe(), &cfg, &cleanup_cfg());
        manager
            .start()
            .await
            .expect("non-leader start should succeed");
    }
}
