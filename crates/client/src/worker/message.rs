//! Control messages posted to the worker by the pages it controls.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use swcache_core::{Error, RequestKey};

use super::OfflineWorker;
use super::lifecycle::ActivateReport;
use crate::fetch::resolve;

/// A message, tagged by its `type` field.
///
/// Unrecognized types parse as [`Message::Unknown`] and are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    SkipWaiting,
    ClearCache,
    /// Store the given URLs (the page and its loaded resources) in the runtime store.
    CacheCurrentPage {
        #[serde(default)]
        urls: Vec<String>,
    },
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Parse a posted message.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if the value is not an object with a string `type`.
    pub fn parse(value: &serde_json::Value) -> Result<Self, Error> {
        Message::deserialize(value).map_err(|e| Error::InvalidMessage(e.to_string()))
    }
}

/// What handling a message did.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MessageReport {
    SkipWaiting { activated: Option<ActivateReport> },
    ClearedCache { deleted: Vec<String> },
    CachedPage { cached: Vec<String>, failed: Vec<String> },
    Ignored,
}

impl OfflineWorker {
    /// Handle one control message.
    ///
    /// # Errors
    ///
    /// Propagates activation or store failures; nothing is reported back to
    /// the page that posted the message.
    pub async fn handle_message(&self, message: Message) -> Result<MessageReport, Error> {
        match message {
            Message::SkipWaiting => {
                let activated = self.skip_waiting().await?;
                Ok(MessageReport::SkipWaiting { activated })
            }
            Message::ClearCache => {
                let deleted = self.db.clear_stores().await?;
                tracing::info!(deleted = deleted.len(), "cleared all cache stores");
                Ok(MessageReport::ClearedCache { deleted })
            }
            Message::CacheCurrentPage { urls } => self.cache_current_page(&urls).await,
            Message::Unknown => {
                tracing::debug!("ignoring unknown message");
                Ok(MessageReport::Ignored)
            }
        }
    }

    async fn cache_current_page(&self, urls: &[String]) -> Result<MessageReport, Error> {
        let store = &self.config.runtime_store;
        self.db.open_store(store).await?;

        let unique: BTreeSet<&str> = urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()).collect();

        let mut cached = Vec::new();
        let mut failed = Vec::new();
        for raw in unique {
            let url = match resolve(&self.config.origin, raw) {
                Ok(url) => url,
                Err(err) => {
                    tracing::debug!(url = %raw, error = %err, "skipping page resource");
                    failed.push(raw.to_string());
                    continue;
                }
            };

            let stored = match self.fetch_ok(&url).await {
                Ok(response) => self.db.put_entry(store, &RequestKey::get(url.as_str()), &response).await,
                Err(err) => Err(err),
            };
            match stored {
                Ok(()) => cached.push(url.to_string()),
                Err(err) => {
                    tracing::debug!(url = %url, error = %err, "failed to cache page resource");
                    failed.push(url.to_string());
                }
            }
        }

        tracing::info!(cached = cached.len(), failed = failed.len(), "cached current page");
        Ok(MessageReport::CachedPage { cached, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerState;
    use crate::worker::testing::{ScriptedNetwork, activated_worker, worker_with};
    use serde_json::json;
    use swcache_core::{CacheDb, Response};

    #[test]
    fn test_parse_known_types() {
        assert_eq!(Message::parse(&json!({"type": "SKIP_WAITING"})).unwrap(), Message::SkipWaiting);
        assert_eq!(Message::parse(&json!({"type": "CLEAR_CACHE"})).unwrap(), Message::ClearCache);
        assert_eq!(
            Message::parse(&json!({"type": "CACHE_CURRENT_PAGE", "urls": ["/"]})).unwrap(),
            Message::CacheCurrentPage { urls: vec!["/".to_string()] }
        );
    }

    #[test]
    fn test_parse_cache_current_page_without_urls() {
        let message = Message::parse(&json!({"type": "CACHE_CURRENT_PAGE"})).unwrap();
        assert_eq!(message, Message::CacheCurrentPage { urls: vec![] });
    }

    #[test]
    fn test_parse_unknown_type() {
        assert_eq!(Message::parse(&json!({"type": "PING", "extra": 1})).unwrap(), Message::Unknown);
    }

    #[test]
    fn test_parse_rejects_untyped() {
        assert!(matches!(Message::parse(&json!({"kind": "SKIP_WAITING"})), Err(Error::InvalidMessage(_))));
        assert!(matches!(Message::parse(&json!("SKIP_WAITING")), Err(Error::InvalidMessage(_))));
    }

    #[tokio::test]
    async fn test_clear_cache_deletes_every_store() {
        let net = ScriptedNetwork::new();
        net.route("https://app.test/api/roles", Response::new(200, "[]"));
        let worker = activated_worker(net.clone()).await;
        worker.handle_fetch(&swcache_core::Request::get("https://app.test/api/roles")).await;
        worker.db.open_store("unrelated").await.unwrap();

        let report = worker.handle_message(Message::ClearCache).await.unwrap();

        let MessageReport::ClearedCache { deleted } = report else { panic!("unexpected report") };
        assert_eq!(deleted.len(), 3);
        assert!(worker.db.store_names().await.unwrap().is_empty());
        let key = RequestKey::get("https://app.test/api/roles");
        assert!(worker.db.match_any(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_skip_waiting_message_activates() {
        let worker = worker_with(ScriptedNetwork::new(), CacheDb::open_in_memory().await.unwrap());
        worker.install().await.unwrap();

        let report = worker.handle_message(Message::SkipWaiting).await.unwrap();

        assert!(matches!(report, MessageReport::SkipWaiting { activated: Some(_) }));
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let worker = activated_worker(ScriptedNetwork::new()).await;
        let before = worker.db.store_names().await.unwrap();

        let report = worker.handle_message(Message::Unknown).await.unwrap();

        assert!(matches!(report, MessageReport::Ignored));
        assert_eq!(worker.db.store_names().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_cache_current_page() {
        let net = ScriptedNetwork::new();
        net.route("https://app.test/reports", Response::new(200, "<html>reports</html>"));
        net.route("https://app.test/assets/app.js", Response::new(200, "app()"));
        let worker = activated_worker(net.clone()).await;

        let message = Message::CacheCurrentPage {
            urls: vec![
                "https://app.test/reports".into(),
                "/assets/app.js".into(),
                "https://app.test/reports".into(),
                "/missing.css".into(),
            ],
        };
        let report = worker.handle_message(message).await.unwrap();

        let MessageReport::CachedPage { cached, failed } = report else { panic!("unexpected report") };
        assert_eq!(cached.len(), 2);
        assert_eq!(failed, vec!["https://app.test/missing.css"]);

        let entry = worker
            .db
            .match_entry("soci-app-runtime-v5", &RequestKey::get("https://app.test/assets/app.js"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.response.text(), "app()");
    }
}
