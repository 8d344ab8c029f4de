//! Strategy execution for intercepted requests.
//!
//! Every strategy produces exactly one outcome. Cache writes happen before
//! the outcome is returned but never change it: a failed or skipped put is
//! logged and the live response still goes back to the page.

use swcache_core::{Error, Request, RequestKey, Response, StoredEntry};
use url::Url;

use super::classify::{Strategy, is_image};
use super::{FetchOutcome, OfflineWorker, ResponseSource, offline};
use crate::fetch::{is_storable_header, resolve};

/// Copy of a response fit for storage: hop-by-hop headers and cookies dropped.
///
/// Bodies over `max_entry_bytes` are not stored at all.
pub(crate) fn storable(response: &Response, max_entry_bytes: usize) -> Result<Response, Error> {
    if response.body.len() > max_entry_bytes {
        return Err(Error::EntryTooLarge(format!("{} bytes exceeds {max_entry_bytes}", response.body.len())));
    }
    let mut copy = response.clone();
    copy.headers.retain(|(name, _)| is_storable_header(name));
    Ok(copy)
}

impl OfflineWorker {
    pub(super) async fn execute(&self, strategy: Strategy, request: &Request, url: &Url) -> FetchOutcome {
        tracing::debug!(url = %url, strategy = strategy.as_str(), "handling request");

        match strategy {
            Strategy::ApiNetworkFirst => self.api_network_first(request, url).await,
            Strategy::NavigationNetworkFirst => self.navigation_network_first(request).await,
            Strategy::HashedAssetCacheFirst => self.hashed_asset_cache_first(request, url).await,
            Strategy::OtherNetworkOnly => self.other_network_only(request, url).await,
        }
    }

    /// Network first; 2xx answers are copied to the runtime store. Offline,
    /// the runtime copy is served, else a JSON 503.
    async fn api_network_first(&self, request: &Request, url: &Url) -> FetchOutcome {
        let strategy = Strategy::ApiNetworkFirst;
        let key = RequestKey::new(&request.method, url.as_str());

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store_copy(&key, &response).await;
                }
                FetchOutcome::responded(strategy, ResponseSource::Network, response)
            }
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "api fetch failed, trying runtime store");
                match self.lookup(Some(&self.config.runtime_store), &key).await {
                    Some(entry) => FetchOutcome::responded(strategy, ResponseSource::Cache, entry.response),
                    None => FetchOutcome::responded(
                        strategy,
                        ResponseSource::Offline,
                        offline::api_offline(&self.config.offline_message),
                    ),
                }
            }
        }
    }

    /// Network first; a 200 page refreshes the single app-shell entry keyed
    /// by the root URL. Offline, the shell is served from the runtime store,
    /// then from any store, then `/index.html`, then a minimal offline page.
    async fn navigation_network_first(&self, request: &Request) -> FetchOutcome {
        let strategy = Strategy::NavigationNetworkFirst;
        let shell = RequestKey::get(self.config.root_url().as_str());

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.store_copy(&shell, &response).await;
                }
                FetchOutcome::responded(strategy, ResponseSource::Network, response)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "navigation failed, serving app shell");
                let mut fallback = self.lookup(Some(&self.config.runtime_store), &shell).await;
                if fallback.is_none() {
                    fallback = self.lookup(None, &shell).await;
                }
                if fallback.is_none()
                    && let Ok(index) = resolve(&self.config.origin, "/index.html")
                {
                    fallback = self.lookup(None, &RequestKey::get(index.as_str())).await;
                }

                match fallback {
                    Some(entry) => FetchOutcome::responded(strategy, ResponseSource::Cache, entry.response),
                    None => FetchOutcome::responded(strategy, ResponseSource::Offline, offline::navigation_offline()),
                }
            }
        }
    }

    /// Any store first with no network call on a hit. A miss goes to the
    /// network and a 200 is stored; a rejected fetch fails the request.
    async fn hashed_asset_cache_first(&self, request: &Request, url: &Url) -> FetchOutcome {
        let strategy = Strategy::HashedAssetCacheFirst;
        let key = RequestKey::new(&request.method, url.as_str());

        if let Some(entry) = self.lookup(None, &key).await {
            return FetchOutcome::responded(strategy, ResponseSource::Cache, entry.response);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.store_copy(&key, &response).await;
                }
                FetchOutcome::responded(strategy, ResponseSource::Network, response)
            }
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "hashed asset unavailable");
                FetchOutcome::Failed { strategy, error }
            }
        }
    }

    /// Network only, nothing stored. Offline, images get an empty
    /// placeholder and everything else a plain 503.
    async fn other_network_only(&self, request: &Request, url: &Url) -> FetchOutcome {
        let strategy = Strategy::OtherNetworkOnly;

        match self.network.fetch(request).await {
            Ok(response) => FetchOutcome::responded(strategy, ResponseSource::Network, response),
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "fetch failed");
                let response = if is_image(url) { offline::image_placeholder() } else { offline::generic_offline() };
                FetchOutcome::responded(strategy, ResponseSource::Offline, response)
            }
        }
    }

    async fn store_copy(&self, key: &RequestKey, response: &Response) {
        let copy = match storable(response, self.config.max_entry_bytes) {
            Ok(copy) => copy,
            Err(err) => {
                tracing::debug!(url = %key.url, error = %err, "not storing response copy");
                return;
            }
        };
        if let Err(err) = self.db.put_entry(&self.config.runtime_store, key, &copy).await {
            tracing::warn!(url = %key.url, error = %err, "failed to store response copy");
        }
    }

    /// Look a key up in one store, or in every store when `store` is `None`.
    ///
    /// A failed lookup on a fallback path is a miss.
    async fn lookup(&self, store: Option<&str>, key: &RequestKey) -> Option<StoredEntry> {
        let result: Result<Option<StoredEntry>, Error> = match store {
            Some(store) => self.db.match_entry(store, key).await,
            None => self.db.match_any(key).await,
        };

        result.unwrap_or_else(|err| {
            tracing::warn!(url = %key.url, error = %err, "cache lookup failed");
            None
        })
    }
}
