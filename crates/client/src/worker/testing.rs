//! Scripted network and worker builders for tests.
//!
//! [`ScriptedNetwork`] is also exported under the `test-util` feature so
//! crates driving an [`OfflineWorker`] can test against the same double.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use swcache_core::{Error, Request, Response};

use crate::fetch::Network;

#[cfg(test)]
use super::{OfflineWorker, WorkerConfig};
#[cfg(test)]
use swcache_core::CacheDb;

#[derive(Default)]
struct Script {
    routes: HashMap<String, Response>,
    offline: bool,
    calls: Vec<String>,
}

/// A network that answers from a fixed route table.
///
/// Unrouted URLs answer 404. While offline every fetch rejects.
#[derive(Clone, Default)]
pub struct ScriptedNetwork {
    script: Arc<Mutex<Script>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn route(&self, url: &str, response: Response) {
        self.script().routes.insert(url.to_string(), response);
    }

    pub fn set_online(&self, online: bool) {
        self.script().offline = !online;
    }

    /// URLs fetched so far, including rejected attempts.
    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let mut script = self.script();
        script.calls.push(request.url.clone());

        if script.offline {
            return Err(Error::Network(format!("{}: connection refused", request.url)));
        }

        Ok(script
            .routes
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found").with_status_text("Not Found")))
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> WorkerConfig {
    WorkerConfig {
        origin: url::Url::parse("https://app.test").unwrap(),
        static_store: "soci-app-static-v5".to_string(),
        runtime_store: "soci-app-runtime-v5".to_string(),
        tunnel_marker: "ngrok".to_string(),
        api_marker: "/api/".to_string(),
        precache_urls: vec!["/".to_string(), "/index.html".to_string()],
        offline_message: "Sin conexión. Los datos no están disponibles.".to_string(),
        script_path: "/service-worker.js".to_string(),
        scope: "/".to_string(),
        max_entry_bytes: 5 * 1024 * 1024,
    }
}

#[cfg(test)]
pub(crate) fn worker_with(network: ScriptedNetwork, db: CacheDb) -> OfflineWorker {
    OfflineWorker::new(test_config(), db, Arc::new(network))
}

/// A registered, activated worker over a fresh in-memory store.
#[cfg(test)]
pub(crate) async fn activated_worker(network: ScriptedNetwork) -> OfflineWorker {
    let worker = worker_with(network, CacheDb::open_in_memory().await.unwrap());
    worker.register().await.unwrap();
    worker
}

/// Like [`activated_worker`], with a tweaked configuration.
#[cfg(test)]
pub(crate) async fn activated_worker_with(config: WorkerConfig, network: ScriptedNetwork) -> OfflineWorker {
    let db = CacheDb::open_in_memory().await.unwrap();
    let worker = OfflineWorker::new(config, db, Arc::new(network));
    worker.register().await.unwrap();
    worker
}
