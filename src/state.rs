use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::cleanup::CleanupEngine;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<CleanupEngine>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        engine: Arc<CleanupEngine>,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            engine,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn engine(&self) -> &CleanupEngine {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use crate::store::memory::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn shutdown_receiver_can_clone() {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(CleanupEngine::new(store.clone(), store, 1000));
        let cfg = Config::test_default();
        let (tx, _) = broadcast::channel(4);
        let state = AppState::new(engine, &cfg, tx.clone());

        let mut rx1 = state.shutdown_rx();
        let mut rx2 = state.shutdown_rx();
        tx.send(()).unwrap();
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();
    }
}
