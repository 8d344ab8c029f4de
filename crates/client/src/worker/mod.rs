//! Offline cache worker.
//!
//! The worker sits between the app's pages and the network. Every event it
//! receives goes through [`OfflineWorker::dispatch`]:
//!
//! - `Install` seeds the static store for the current version
//! - `Activate` prunes other versions' stores and claims the pages
//! - `Fetch` classifies the request and runs one strategy
//! - `Message` handles control messages from the pages
//!
//! The worker holds no cached state of its own; everything it knows lives
//! in the [`CacheDb`] and survives restarts.

mod classify;
mod lifecycle;
mod message;
pub mod offline;
mod strategy;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::Serialize;
use swcache_core::{AppConfig, CacheDb, Error, Request, Response};
use tokio::sync::watch;
use url::Url;

use crate::fetch::Network;

pub use classify::{Classifier, Decision, Exclusion, Strategy, is_hashed_asset, is_image};
pub use lifecycle::{ActivateReport, InstallReport, Registration, UpdateCheck, WorkerState};
pub use message::{Message, MessageReport};

/// Settings the worker runs with, derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub static_store: String,
    pub runtime_store: String,
    pub tunnel_marker: String,
    pub api_marker: String,
    pub precache_urls: Vec<String>,
    pub offline_message: String,
    pub script_path: String,
    pub scope: String,
    /// Responses with bodies over this many bytes are served but never stored.
    pub max_entry_bytes: usize,
}

impl WorkerConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;

        Ok(Self {
            origin,
            static_store: config.static_store(),
            runtime_store: config.runtime_store(),
            tunnel_marker: config.tunnel_marker.clone(),
            api_marker: config.api_marker.clone(),
            precache_urls: config.precache_urls.clone(),
            offline_message: config.offline_message.clone(),
            script_path: config.script_path.clone(),
            scope: config.scope.clone(),
            max_entry_bytes: config.max_entry_bytes,
        })
    }

    /// The app root; its entry doubles as the app shell.
    pub fn root_url(&self) -> Url {
        let mut root = self.origin.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        root
    }
}

/// An event delivered to the worker.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Message(Message),
}

/// The result of handling one [`Event`].
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetch(FetchOutcome),
    Message(MessageReport),
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// Synthesized by the worker.
    Offline,
}

/// The result of an intercepted fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// No active worker controls the page; the request goes straight to the network.
    NotControlled,
    /// Excluded from handling; the request goes straight to the network.
    Passthrough(Exclusion),
    Responded { strategy: Strategy, source: ResponseSource, response: Response },
    /// The strategy had nothing to answer with and the request fails.
    Failed { strategy: Strategy, error: Error },
}

impl FetchOutcome {
    pub(crate) fn responded(strategy: Strategy, source: ResponseSource, response: Response) -> Self {
        FetchOutcome::Responded { strategy, source, response }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Responded { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Responded { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            FetchOutcome::Responded { strategy, .. } | FetchOutcome::Failed { strategy, .. } => Some(*strategy),
            _ => None,
        }
    }
}

/// The offline cache worker for one application origin.
pub struct OfflineWorker {
    config: WorkerConfig,
    classifier: Classifier,
    db: CacheDb,
    network: Arc<dyn Network>,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    controlling: AtomicBool,
}

impl OfflineWorker {
    pub fn new(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let classifier = Classifier::new(&config.origin, config.tunnel_marker.clone(), config.api_marker.clone());
        let (state, _) = watch::channel(WorkerState::Parsed);

        Self {
            config,
            classifier,
            db,
            network,
            state,
            skip_waiting: AtomicBool::new(false),
            controlling: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Route an event to its handler.
    ///
    /// # Errors
    ///
    /// Lifecycle and message failures propagate. Fetch handling never errors:
    /// a request the worker cannot answer is reported as
    /// [`FetchOutcome::Failed`].
    pub async fn dispatch(&self, event: Event) -> Result<EventOutcome, Error> {
        match event {
            Event::Install => self.install().await.map(EventOutcome::Installed),
            Event::Activate => self.activate().await.map(EventOutcome::Activated),
            Event::Fetch(request) => Ok(EventOutcome::Fetch(self.handle_fetch(&request).await)),
            Event::Message(message) => self.handle_message(message).await.map(EventOutcome::Message),
        }
    }

    /// Intercept one request.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        if !self.is_controlling() {
            return FetchOutcome::NotControlled;
        }

        match self.classifier.classify(request) {
            Decision::Ignore(exclusion) => {
                tracing::trace!(url = %request.url, ?exclusion, "passing request through");
                FetchOutcome::Passthrough(exclusion)
            }
            Decision::Handle { strategy, url } => self.execute(strategy, request, &url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{ScriptedNetwork, activated_worker, worker_with};

    #[test]
    fn test_worker_config_from_app() {
        let app = AppConfig { origin: "https://app.test".into(), cache_version: "v6".into(), ..Default::default() };
        let config = WorkerConfig::from_app(&app).unwrap();
        assert_eq!(config.static_store, "soci-app-static-v6");
        assert_eq!(config.runtime_store, "soci-app-runtime-v6");
        assert_eq!(config.root_url().as_str(), "https://app.test/");
        assert_eq!(config.max_entry_bytes, app.max_entry_bytes);
    }

    #[test]
    fn test_worker_config_rejects_bad_origin() {
        let app = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert!(matches!(WorkerConfig::from_app(&app), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_before_activation_not_controlled() {
        let net = ScriptedNetwork::new();
        let worker = worker_with(net.clone(), CacheDb::open_in_memory().await.unwrap());

        let outcome = worker.handle_fetch(&Request::get("https://app.test/api/roles")).await;

        assert!(matches!(outcome, FetchOutcome::NotControlled));
        assert!(net.calls().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_request_untouched() {
        let net = ScriptedNetwork::new();
        let worker = activated_worker(net.clone()).await;
        let calls_before = net.calls().len();
        let stores_before = worker.db.store_names().await.unwrap();

        let outcome = worker.handle_fetch(&Request::get("https://tile.openstreetmap.org/5/9/15.png")).await;

        assert!(matches!(outcome, FetchOutcome::Passthrough(Exclusion::ForeignOrigin)));
        assert_eq!(net.calls().len(), calls_before);
        assert_eq!(worker.db.store_names().await.unwrap(), stores_before);
        assert_eq!(worker.db.entry_count("soci-app-runtime-v5").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_routes_events() {
        let net = ScriptedNetwork::new();
        net.route("https://app.test/api/roles", Response::new(200, "[]"));
        let worker = worker_with(net.clone(), CacheDb::open_in_memory().await.unwrap());

        assert!(matches!(worker.dispatch(Event::Install).await.unwrap(), EventOutcome::Installed(_)));
        assert!(matches!(worker.dispatch(Event::Activate).await.unwrap(), EventOutcome::Activated(_)));

        let outcome = worker.dispatch(Event::Fetch(Request::get("https://app.test/api/roles"))).await.unwrap();
        let EventOutcome::Fetch(fetch) = outcome else { panic!("unexpected outcome") };
        assert_eq!(fetch.strategy(), Some(Strategy::ApiNetworkFirst));

        let outcome = worker.dispatch(Event::Message(Message::Unknown)).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Message(MessageReport::Ignored)));
    }

    #[tokio::test]
    async fn test_dispatch_activate_out_of_order_errors() {
        let worker = worker_with(ScriptedNetwork::new(), CacheDb::open_in_memory().await.unwrap());
        assert!(worker.dispatch(Event::Activate).await.is_err());
    }
}
