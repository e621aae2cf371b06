//! Content-type classification and charset resolution.
//!
//! All functions here are total: a missing, blank, or unparseable content type
//! degrades to "binary" and UTF-8 instead of producing an error.

use std::fmt;

use encoding_rs::{Encoding, UTF_8};
use mime::Mime;
use tracing::debug;

/// Exact media types (besides any `text/*`) that are treated as text.
const TEXT_MEDIA_TYPES: &[&str] = &[
    "application/xml",
    "application/json",
    "application/javascript",
    "application/soap+xml",
];

/// Subtype fragments that mark vendor or custom types as text.
///
/// Matched as raw substrings, so `application/vnd.mixml` counts as text too.
const TEXT_SUBTYPE_HINTS: &[&str] = &["xml", "json"];

/// Labels naming ISO-8859-1 proper.
///
/// `encoding_rs` folds these into windows-1252, which maps 0x80..=0x9F to
/// punctuation instead of the C1 controls.
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "iso-ir-100",
    "latin1",
    "l1",
    "csisolatin1",
    "ibm819",
    "cp819",
];

/// Parses a raw `Content-Type` value.
///
/// Returns `None` for blank or malformed input.
#[must_use]
pub fn parse_media_type(raw: &str) -> Option<Mime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<Mime>() {
        Ok(mime) => Some(mime),
        Err(error) => {
            debug!(content_type = %trimmed, error = %error, "unparseable content type");
            None
        }
    }
}

/// Returns true if a body with this content type should be decoded to text.
#[must_use]
pub fn is_text_content(content_type: Option<&str>) -> bool {
    let Some(mime) = content_type.and_then(parse_media_type) else {
        return false;
    };

    let essence = mime.essence_str().to_ascii_lowercase();
    let (top_level, subtype) = essence.split_once('/').unwrap_or((essence.as_str(), ""));

    top_level == "text"
        || TEXT_MEDIA_TYPES.contains(&essence.as_str())
        || TEXT_SUBTYPE_HINTS.iter().any(|hint| subtype.contains(hint))
}

/// Resolves the charset used to decode a text body.
///
/// Falls back to UTF-8 when the content type is absent, malformed, carries no
/// `charset` parameter, or names a charset that is not supported.
#[must_use]
pub fn resolve_charset(content_type: Option<&str>) -> Charset {
    let Some(mime) = content_type.and_then(parse_media_type) else {
        return Charset::utf8();
    };
    let Some(label) = mime.get_param(mime::CHARSET) else {
        return Charset::utf8();
    };

    let label = label.as_str().trim().trim_matches('"');
    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) => Charset {
            name: label.to_ascii_uppercase(),
            encoding,
            latin1: LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)),
        },
        None => {
            debug!(charset = %label, "unsupported charset, falling back to UTF-8");
            Charset::utf8()
        }
    }
}

/// A resolved character set: the declared name plus its decoder.
#[derive(Clone, PartialEq, Eq)]
pub struct Charset {
    name: String,
    encoding: &'static Encoding,
    latin1: bool,
}

impl Charset {
    /// The UTF-8 default.
    #[must_use]
    pub fn utf8() -> Self {
        Self {
            name: "UTF-8".to_string(),
            encoding: UTF_8,
            latin1: false,
        }
    }

    /// Charset name as declared (upper-cased), e.g. `ISO-8859-1`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The decoder backing this charset.
    ///
    /// ISO-8859-1 labels report windows-1252 here but decode as true Latin-1.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Decodes bytes with the declared charset, replacing malformed sequences.
    ///
    /// A leading BOM is not sniffed; it decodes like any other bytes.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        if self.latin1 {
            return encoding_rs::mem::decode_latin1(bytes).into_owned();
        }
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if had_errors {
            debug!(charset = %self.name, "replaced malformed sequences while decoding");
        }
        text.into_owned()
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Charset")
            .field("name", &self.name)
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
