//! Responses synthesized when neither the network nor a store can answer.

use swcache_core::Response;

/// Last-resort page for a navigation with no cached shell.
pub const OFFLINE_HTML: &str = concat!(
    "<!DOCTYPE html><html><head><meta charset=\"UTF-8\"><title>Offline</title></head>",
    "<body><h1>Sin conexión</h1><p>Recarga cuando tengas internet</p></body></html>"
);

/// JSON error for an API call made while offline: `{"error":"offline",...}`, 503.
pub fn api_offline(message: &str) -> Response {
    let body = serde_json::json!({ "error": "offline", "message": message });
    Response::new(503, body.to_string())
        .with_status_text("Service Unavailable")
        .with_header("Content-Type", "application/json")
}

/// Minimal offline HTML page, 200.
pub fn navigation_offline() -> Response {
    Response::new(200, OFFLINE_HTML)
        .with_status_text("OK")
        .with_header("Content-Type", "text/html")
}

/// Empty image so broken `<img>` tags don't show, 200.
pub fn image_placeholder() -> Response {
    Response::new(200, "")
        .with_status_text("OK")
        .with_header("Content-Type", "image/svg+xml")
}

/// Plain-text "Offline", 503.
pub fn generic_offline() -> Response {
    Response::new(503, "Offline")
        .with_status_text("Service Unavailable")
        .with_header("Content-Type", "text/plain")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_offline_body() {
        let resp = api_offline("Sin conexión. Los datos no están disponibles.");
        assert_eq!(resp.status, 503);
        assert_eq!(resp.content_type(), Some("application/json"));

        let json: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(json["error"], "offline");
        assert_eq!(json["message"], "Sin conexión. Los datos no están disponibles.");
    }

    #[test]
    fn test_api_offline_escapes_message() {
        let resp = api_offline(r#"say "hi""#);
        let json: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(json["message"], r#"say "hi""#);
    }

    #[test]
    fn test_navigation_offline() {
        let resp = navigation_offline();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type(), Some("text/html"));
        assert!(resp.text().starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_image_placeholder_is_empty() {
        let resp = image_placeholder();
        assert_eq!(resp.status, 200);
        assert!(resp.body.is_empty());
        assert_eq!(resp.content_type(), Some("image/svg+xml"));
    }

    #[test]
    fn test_generic_offline() {
        let resp = generic_offline();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.text(), "Offline");
    }
}
