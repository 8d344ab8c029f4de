//! Request identity used as the key of every cache store.

use sha2::{Digest, Sha256};

/// Compute the store key for a request: method and URL, fragment dropped.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(strip_fragment(url).as_bytes());
    hex::encode(hasher.finalize())
}

fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(before, _)| before)
}

/// The identity a response is stored and matched under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
    pub hash: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: strip_fragment(url).to_string(),
            hash: compute_request_key(method, url),
        }
    }

    /// Key for a `GET` of the given absolute URL.
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }
}
