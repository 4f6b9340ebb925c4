use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::net::{endpoints, ApiClient};

/// Session-scoped key/value store shared with background preloads.
#[derive(Debug, Clone, Default)]
pub struct SessionStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: String) {
        self.lock().insert(key.to_string(), value);
    }

    pub fn remove_item(&self, key: &str) -> Option<String> {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn preview_key(freelancer_id: &str) -> String {
    format!("freelancer_preview_{freelancer_id}")
}

#[derive(Debug, Default)]
struct PreloadState {
    preloaded: HashSet<String>,
    in_flight: HashSet<String>,
}

/// Tracks which freelancer previews were fetched during this page lifetime.
#[derive(Debug, Clone, Default)]
pub struct PreloadCache {
    state: Arc<Mutex<PreloadState>>,
    storage: SessionStorage,
}

impl PreloadCache {
    pub fn new(storage: SessionStorage) -> Self {
        Self {
            state: Arc::default(),
            storage,
        }
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    pub fn is_preloaded(&self, freelancer_id: &str) -> bool {
        self.lock().preloaded.contains(freelancer_id)
    }

    /// Starts a background preview fetch unless one already succeeded or is
    /// still running. Returns whether a request was started; nothing starts
    /// outside a tokio runtime.
    pub fn preload(
        &self,
        api: Arc<dyn ApiClient>,
        tasks: &mut JoinSet<()>,
        freelancer_id: &str,
    ) -> bool {
        if Handle::try_current().is_err() {
            warn!(target: "preload", %freelancer_id, "no runtime, preload skipped");
            return false;
        }

        {
            let mut state = self.lock();
            if state.preloaded.contains(freelancer_id) || state.in_flight.contains(freelancer_id) {
                return false;
            }
            state.in_flight.insert(freelancer_id.to_string());
        }

        let cache = self.clone();
        let freelancer_id = freelancer_id.to_string();
        tasks.spawn(async move {
            let result = api.get_json(&endpoints::preview(&freelancer_id)).await;
            let mut state = cache.lock();
            state.in_flight.remove(&freelancer_id);
            match result {
                Ok(preview) => {
                    cache
                        .storage
                        .set_item(&preview_key(&freelancer_id), preview.to_string());
                    state.preloaded.insert(freelancer_id.clone());
                    debug!(target: "preload", freelancer_id = %freelancer_id, "preview cached");
                }
                Err(err) => {
                    warn!(target: "preload", freelancer_id = %freelancer_id, error = %err, "preview preload failed");
                }
            }
        });
        true
    }

    fn lock(&self) -> MutexGuard<'_, PreloadState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
