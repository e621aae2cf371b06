//! Structured, serialization-ready view of a completed response.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::body::ByteSource;
use crate::content_type::{is_text_content, resolve_charset};
use crate::cookies::Cookie;
use crate::error::MapError;
use crate::headers::{ResponseHeaders, header_value, normalize_headers};

/// The mapped response.
///
/// Serializes as `status`, `message`, `body`, `bodyStream`, `contentType`,
/// `headers`, `cookies`, in that order.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseDescriptor {
    status: u16,
    message: String,
    #[serde(rename = "body")]
    body_text: Option<String>,
    #[serde(rename = "bodyStream")]
    body_source: ByteSource,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    headers: ResponseHeaders,
    cookies: Vec<Cookie>,
}

impl ResponseDescriptor {
    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Status message (reason phrase).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Decoded body; `None` for binary content.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        self.body_text.as_deref()
    }

    /// Raw body bytes, always available.
    #[must_use]
    pub fn body_source(&self) -> &ByteSource {
        &self.body_source
    }

    /// The `Content-Type` header as received.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Normalized headers.
    #[must_use]
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// Cookie snapshot for the exchange target.
    #[must_use]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Consumes the descriptor and returns the body source.
    #[must_use]
    pub fn into_body_source(self) -> ByteSource {
        self.body_source
    }
}

/// Builds a descriptor from response parts and a materialized body.
///
/// For `HEAD` requests the body is empty and the text body is `""`,
/// whatever `body` and the headers say. Otherwise text content (see
/// [`is_text_content`]) is decoded eagerly with the resolved charset.
///
/// # Errors
///
/// Returns [`MapError::Decode`] if a text body cannot be read back.
#[instrument(level = "debug", skip(headers, body, cookies), fields(body_bytes = body.len()))]
pub async fn build_descriptor(
    status: u16,
    message: &str,
    headers: &[(String, String)],
    method: &str,
    body: ByteSource,
    cookies: Vec<Cookie>,
) -> Result<ResponseDescriptor, MapError> {
    let content_type = header_value(headers, "content-type").map(str::to_string);

    let (body_source, body_text) = if method.eq_ignore_ascii_case("HEAD") {
        (ByteSource::empty(), Some(String::new()))
    } else if is_text_content(content_type.as_deref()) {
        let charset = resolve_charset(content_type.as_deref());
        let text = body.read_to_string(&charset).await?;
        debug!(charset = %charset, chars = text.len(), "decoded text body");
        (body, Some(text))
    } else {
        (body, None)
    };

    Ok(ResponseDescriptor {
        status,
        message: message.to_string(),
        body_text,
        body_source,
        content_type,
        headers: normalize_headers(headers),
        cookies,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect()
    }

    fn memory(body: &'static [u8]) -> ByteSource {
        ByteSource::InMemory(Bytes::from_static(body))
    }

    #[tokio::test]
    async fn test_text_body_is_decoded() {
        let descriptor = build_descriptor(
            200,
            "OK",
            &headers(&[("Content-Type", "application/json")]),
            "GET",
            memory(br#"{"ok":true}"#),
            Vec::new(),
        )
        .await
        .unwrap();

        assert_eq!(descriptor.status(), 200);
        assert_eq!(descriptor.message(), "OK");
        assert_eq!(descriptor.content_type(), Some("application/json"));
        assert_eq!(descriptor.body_text(), Some(r#"{"ok":true}"#));
        assert_eq!(descriptor.body_source().len(), 11);
    }

    #[tokio::test]
    async fn test_text_body_uses_declared_charset() {
        let descriptor = build_descriptor(
            200,
            "OK",
            &headers(&[("content-type", "text/plain; charset=ISO-8859-1")]),
            "GET",
            memory(&[0x72, 0xE9, 0x73, 0x75, 0x6D, 0xE9]),
            Vec::new(),
        )
        .await
        .unwrap();
        assert_eq!(descriptor.body_text(), Some("résumé"));
    }

    #[tokio::test]
    async fn test_binary_body_has_no_text() {
        let descriptor = build_descriptor(
            200,
            "OK",
            &headers(&[("Content-Type", "image/png")]),
            "GET",
            memory(&[0x89, 0x50, 0x4E, 0x47]),
            Vec::new(),
        )
        .await
        .unwrap();
        assert_eq!(descriptor.body_text(), None);
        assert_eq!(&descriptor.body_source().read_all().await.unwrap()[..], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_binary() {
        let descriptor = build_descriptor(204, "No Content", &[], "GET", ByteSource::empty(), Vec::new())
            .await
            .unwrap();
        assert_eq!(descriptor.content_type(), None);
        assert_eq!(descriptor.body_text(), None);
    }

    #[tokio::test]
    async fn test_malformed_content_type_degrades_to_binary() {
        let descriptor = build_descriptor(
            200,
            "OK",
            &headers(&[("Content-Type", "this is not; a mime")]),
            "GET",
            memory(b"raw"),
            Vec::new(),
        )
        .await
        .unwrap();
        assert_eq!(descriptor.content_type(), Some("this is not; a mime"));
        assert_eq!(descriptor.body_text(), None);
    }

    #[tokio::test]
    async fn test_head_has_empty_body_regardless_of_headers() {
        let descriptor = build_descriptor(
            200,
            "OK",
            &headers(&[("Content-Type", "text/html"), ("Content-Length", "5000")]),
            "head",
            memory(b"ignored"),
            Vec::new(),
        )
        .await
        .unwrap();
        assert!(descriptor.body_source().is_empty());
        assert_eq!(descriptor.body_text(), Some(""));
        assert_eq!(descriptor.headers().get("Content-Length"), Some("5000"));
    }

    #[tokio::test]
    async fn test_decode_failure_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let named = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        let temp_path = named.into_temp_path();
        let source = ByteSource::SpooledFile(Arc::new(crate::body::SpooledFile::new(temp_path, 0)));
        source.release().unwrap();

        let result = build_descriptor(
            200,
            "OK",
            &headers(&[("Content-Type", "text/plain")]),
            "GET",
            source,
            Vec::new(),
        )
        .await;
        assert!(matches!(result, Err(MapError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_serialized_shape() {
        let cookie = Cookie::new(
            "sid".to_string(),
            "v".to_string(),
            "/".to_string(),
            "example.com".to_string(),
            None,
            false,
            true,
        );
        let descriptor = build_descriptor(
            404,
            "Not Found",
            &headers(&[
                ("Content-Type", "text/plain"),
                ("OkHttp-Sent-Millis", "1"),
                ("X-Trace", "t-1"),
            ]),
            "GET",
            memory(b"missing"),
            vec![cookie],
        )
        .await
        .unwrap();

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": 404,
                "message": "Not Found",
                "body": "missing",
                "bodyStream": { "storage": "memory", "size": 7 },
                "contentType": "text/plain",
                "headers": { "Content-Type": "text/plain", "X-Trace": "t-1" },
                "cookies": [{
                    "name": "sid",
                    "value": "v",
                    "path": "/",
                    "domain": "example.com",
                    "expires": null,
                    "secure": false,
                    "httpOnly": true,
                }],
            })
        );

        let text = serde_json::to_string(&descriptor).unwrap();
        let keys: Vec<usize> = ["\"status\"", "\"message\"", "\"body\"", "\"bodyStream\"", "\"contentType\"", "\"headers\"", "\"cookies\""]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "unexpected key order: {text}");
    }
}
