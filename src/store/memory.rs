//! In-memory store double used by engine and router tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::store::{ExpiredSession, ObjectStore, SessionStore, StoreError};

#[derive(Debug, Default)]
struct State {
    // session_id -> (storage_prefix, created_at)
    sessions: BTreeMap<String, (String, DateTime<Utc>)>,
    // storage_prefix -> object names under it
    objects: BTreeMap<String, Vec<String>>,
    fail_query: bool,
    fail_delete_sessions: bool,
    fail_list_prefixes: HashSet<String>,
    fail_remove_prefixes: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn injected(op: &str) -> StoreError {
    StoreError::Api {
        status: 500,
        message: format!("injected {op} failure"),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_session(&self, session_id: &str, prefix: &str, created_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state
            .sessions
            .insert(session_id.to_string(), (prefix.to_string(), created_at));
    }

    pub fn insert_object(&self, prefix: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .objects
            .entry(prefix.to_string())
            .or_default()
            .push(name.to_string());
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    pub fn object_count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(prefix)
            .map_or(0, Vec::len)
    }

    pub fn fail_query(&self) {
        self.state.lock().unwrap().fail_query = true;
    }

    pub fn fail_delete_sessions(&self) {
        self.state.lock().unwrap().fail_delete_sessions = true;
    }

    pub fn fail_list(&self, prefix: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_list_prefixes
            .insert(prefix.to_string());
    }

    pub fn fail_remove(&self, prefix: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_remove_prefixes
            .insert(prefix.to_string());
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn expired_sessions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ExpiredSession>, StoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_query {
            return Err(injected("query"));
        }
        Ok(state
            .sessions
            .iter()
            .filter(|(_, (_, created_at))| *created_at < cutoff)
            .map(|(id, (prefix, _))| ExpiredSession {
                session_id: id.clone(),
                storage_prefix: prefix.clone(),
            })
            .collect())
    }

    async fn delete_sessions(&self, session_ids: &[String]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete_sessions {
            return Err(injected("session delete"));
        }
        for id in session_ids {
            state.sessions.remove(id);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(
        &self,
        prefix: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_list_prefixes.contains(prefix) {
            return Err(injected("list"));
        }
        let names = state.objects.get(prefix).cloned().unwrap_or_default();
        Ok(names.into_iter().skip(offset).take(limit).collect())
    }

    async fn remove_objects(&self, paths: &[String]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        for path in paths {
            let Some((prefix, name)) = path.rsplit_once('/') else {
                continue;
            };
            if state.fail_remove_prefixes.contains(prefix) {
                return Err(injected("remove"));
            }
            if let Some(names) = state.objects.get_mut(prefix) {
                names.retain(|n| n != name);
            }
        }
        Ok(())
    }
}
