//! Response shaping.

use edge_core::{Response, StatusCode};
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use serde::Serialize;

use crate::ApiError;

/// Body of a 404 for a missing package or aggregated document.
pub const NOT_FOUND_MESSAGE: &str = "metadata not found";
/// Body of the `/favicon.ico` reply.
pub const FAVICON_MESSAGE: &str = "not found";
/// Body of a 403 for an unknown path.
pub const FORBIDDEN_MESSAGE: &str = "invalid request";
/// Body of a 500 in production.
pub const FAILURE_MESSAGE: &str = "something went wrong";

const JSON: &str = "application/json";

/// 200 with a stored JSON document, passed through untouched.
pub fn json_document(body: Vec<u8>) -> Response {
    Response::new(StatusCode::OK)
        .with_header(CONTENT_TYPE.as_str(), JSON)
        .with_body(body)
}

/// 200 with `value` serialized as JSON.
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value).map_err(|e| ApiError::Response(e.to_string()))?;
    Ok(json_document(body))
}

/// 200 with a gzip-compressed JSON document.
pub fn gzip_json(body: Vec<u8>) -> Response {
    json_document(body).with_header(CONTENT_ENCODING.as_str(), "gzip")
}

/// 404 with a text message.
pub fn not_found(message: impl Into<String>) -> Response {
    Response::text(StatusCode::NOT_FOUND, message)
}

/// 404 for a missing version.
pub fn version_not_found(version_key: &str) -> Response {
    not_found(format!("version not found: {}", version_key))
}

/// 403 for an unknown path.
pub fn forbidden() -> Response {
    Response::text(StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE)
}

/// 500 with the given body.
pub fn failure(body: impl Into<String>) -> Response {
    Response::text(StatusCode::INTERNAL_SERVER_ERROR, body)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_json_serializes_empty_collections() {
        let list = json::<[String]>(&[]).unwrap();
        assert_eq!(list.body_text(), Some("[]"));

        let map = json(&BTreeMap::<String, String>::new()).unwrap();
        assert_eq!(map.body_text(), Some("{}"));
        assert_eq!(map.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_document_passes_through() {
        let resp = json_document(br#"{ "name" : "x" }"#.to_vec());
        assert_eq!(resp.body_text(), Some(r#"{ "name" : "x" }"#));
    }

    #[test]
    fn test_gzip_headers() {
        let resp = gzip_json(vec![0x1f, 0x8b]);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.header("Content-Encoding"), Some("gzip"));
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_text_replies() {
        assert_eq!(not_found(NOT_FOUND_MESSAGE).body_text(), Some("metadata not found"));
        assert_eq!(
            version_not_found("jquery/0.0.1").body_text(),
            Some("version not found: jquery/0.0.1")
        );
        let forbidden = forbidden();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.body_text(), Some("invalid request"));
        assert!(forbidden.header("cache-control").is_none());
        assert_eq!(
            failure(FAILURE_MESSAGE).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
