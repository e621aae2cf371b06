//! Response header normalization.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Transport-internal pseudo-headers that are dropped from the output.
///
/// Compared case-insensitively.
pub const SKIP_HEADERS: [&str; 3] = [
    "okhttp-received-millis",
    "okhttp-selected-protocol",
    "okhttp-sent-millis",
];

/// Returns true if `name` is in [`SKIP_HEADERS`].
#[must_use]
pub fn is_skipped_header(name: &str) -> bool {
    SKIP_HEADERS
        .iter()
        .any(|skipped| skipped.eq_ignore_ascii_case(name))
}

/// Looks up a header value case-insensitively, returning the last occurrence.
#[must_use]
pub fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .rev()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Ordered, single-valued view of the response headers.
///
/// Serializes as a map in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    /// Value for `name`, matched case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        header_value(&self.entries, name)
    }

    /// Returns true if a header named `name` is present (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl Serialize for ResponseHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Builds the output header mapping from raw headers in wire order.
///
/// Skip-set headers are dropped. Repeated names (compared case-insensitively)
/// collapse into one entry at the first occurrence's position and casing,
/// holding the last value received.
#[must_use]
pub fn normalize_headers(raw: &[(String, String)]) -> ResponseHeaders {
    let mut entries: Vec<(String, String)> = Vec::with_capacity(raw.len());
    for (name, value) in raw {
        if is_skipped_header(name) {
            continue;
        }
        match entries.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(existing) => existing.1.clone_from(value),
            None => entries.push((name.clone(), value.clone())),
        }
    }
    ResponseHeaders { entries }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_skip_set_is_case_insensitive() {
        let headers = normalize_headers(&raw(&[
            ("OkHttp-Received-Millis", "1700000000000"),
            ("OKHTTP-SENT-MILLIS", "1699999999000"),
            ("okhttp-selected-protocol", "h2"),
            ("Content-Length", "42"),
        ]));
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("content-length"), Some("42"));
        assert!(!headers.contains("OkHttp-Received-Millis"));
    }

    #[test]
    fn test_original_casing_preserved() {
        let headers = normalize_headers(&raw(&[("X-Request-ID", "abc"), ("content-type", "text/plain")]));
        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["X-Request-ID", "content-type"]);
    }

    #[test]
    fn test_repeated_header_keeps_first_position_and_last_value() {
        let headers = normalize_headers(&raw(&[
            ("Set-Cookie", "a=1"),
            ("Date", "Mon, 01 Jan 2024 00:00:00 GMT"),
            ("set-cookie", "b=2"),
        ]));
        let pairs: Vec<(&str, &str)> = headers.iter().collect();
        assert_eq!(
            pairs,
            vec![("Set-Cookie", "b=2"), ("Date", "Mon, 01 Jan 2024 00:00:00 GMT")]
        );
    }

    #[test]
    fn test_header_value_returns_last_match() {
        let headers = raw(&[("Content-Type", "text/plain"), ("content-type", "application/json")]);
        assert_eq!(header_value(&headers, "CONTENT-TYPE"), Some("application/json"));
        assert_eq!(header_value(&headers, "content-length"), None);
    }

    #[test]
    fn test_serialize_preserves_order() {
        let headers = normalize_headers(&raw(&[("Zeta", "1"), ("Alpha", "2")]));
        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"{"Zeta":"1","Alpha":"2"}"#);
    }

    #[test]
    fn test_empty_headers() {
        let headers = normalize_headers(&[]);
        assert!(headers.is_empty());
        assert_eq!(serde_json::to_string(&headers).unwrap(), "{}");
    }
}
