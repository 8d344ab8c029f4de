//! Request classification.
//!
//! [`Classifier::classify`] is a pure function of the request: no I/O, no
//! state, re-derived for every request. Exclusions are checked first and
//! the first match wins; a request that survives them gets exactly one
//! strategy.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use swcache_core::{Destination, Request, RequestMode};
use url::Url;

use crate::fetch::origin_of;

/// An 8+ hex-character segment right before a `.js` or `.css` extension.
static HASHED_ASSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.[a-f0-9]{8,}\.(js|css)$").expect("valid hashed asset pattern"));

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|gif|svg|ico)$").expect("valid image pattern"));

/// How an intercepted request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    ApiNetworkFirst,
    NavigationNetworkFirst,
    HashedAssetCacheFirst,
    OtherNetworkOnly,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ApiNetworkFirst => "api-network-first",
            Strategy::NavigationNetworkFirst => "navigation-network-first",
            Strategy::HashedAssetCacheFirst => "hashed-asset-cache-first",
            Strategy::OtherNetworkOnly => "other-network-only",
        }
    }
}

/// Why a request is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Exclusion {
    /// The URL did not parse as an absolute URL.
    Unparsable,
    NotHttp,
    ForeignOrigin,
    /// Dev-server internals, non-GET methods, worker scripts.
    DevResource,
}

/// The outcome of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Ignore(Exclusion),
    Handle { strategy: Strategy, url: Url },
}

impl Decision {
    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            Decision::Handle { strategy, .. } => Some(*strategy),
            Decision::Ignore(_) => None,
        }
    }
}

/// Classifies requests for one application origin.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: String,
    tunnel_marker: String,
    api_marker: String,
}

impl Classifier {
    pub fn new(origin: &Url, tunnel_marker: impl Into<String>, api_marker: impl Into<String>) -> Self {
        Self { origin: origin_of(origin), tunnel_marker: tunnel_marker.into(), api_marker: api_marker.into() }
    }

    pub fn classify(&self, request: &Request) -> Decision {
        let Ok(url) = Url::parse(&request.url) else {
            return Decision::Ignore(Exclusion::Unparsable);
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Decision::Ignore(Exclusion::NotHttp);
        }

        if !self.is_trusted_origin(&url) {
            return Decision::Ignore(Exclusion::ForeignOrigin);
        }

        if is_dev_resource(&url, request) {
            return Decision::Ignore(Exclusion::DevResource);
        }

        let strategy = if self.is_api(&url) {
            Strategy::ApiNetworkFirst
        } else if request.mode == RequestMode::Navigate {
            Strategy::NavigationNetworkFirst
        } else if is_hashed_asset(&url) {
            Strategy::HashedAssetCacheFirst
        } else {
            Strategy::OtherNetworkOnly
        };

        Decision::Handle { strategy, url }
    }

    fn is_trusted_origin(&self, url: &Url) -> bool {
        let origin = origin_of(url);
        origin == self.origin || self.matches_tunnel(&origin)
    }

    fn is_api(&self, url: &Url) -> bool {
        url.path().contains(&self.api_marker) || url.host_str().is_some_and(|host| self.matches_tunnel(host))
    }

    fn matches_tunnel(&self, haystack: &str) -> bool {
        !self.tunnel_marker.is_empty() && haystack.contains(&self.tunnel_marker)
    }
}

fn is_dev_host(url: &Url) -> bool {
    url.host_str().is_some_and(|host| host == "localhost" || host.contains("127.0.0.1"))
}

/// Dev-server internals are only excluded on a dev host; non-GET requests
/// and worker scripts are excluded everywhere.
fn is_dev_resource(url: &Url, request: &Request) -> bool {
    if !request.is_get() || request.destination == Destination::Worker {
        return true;
    }

    if !is_dev_host(url) {
        return false;
    }

    let path = url.path();
    let search = url.query().map(|q| format!("?{q}")).unwrap_or_default();
    path.starts_with("/@")
        || path.starts_with("/__")
        || path.contains("/node_modules")
        || path.contains("@vite")
        || path.contains("@react-refresh")
        || path.contains("/src/")
        || search.contains("?import")
        || search.contains("?direct")
        || search.contains("t=")
}

pub fn is_hashed_asset(url: &Url) -> bool {
    HASHED_ASSET.is_match(url.path())
}

pub fn is_image(url: &Url) -> bool {
    IMAGE.is_match(url.path())
}
