//! Error types for response mapping.
//!
//! Every variant here is fatal for the exchange it came from. Malformed
//! content types never show up as errors; classification degrades instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while turning a response into a descriptor.
#[derive(Debug, Error)]
pub enum MapError {
    /// Reading the response body from the transport failed.
    #[error("failed to drain response body: {source}")]
    Drain {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Creating, writing, or flushing the spool file failed.
    #[error("failed to spool response body to {path}: {source}")]
    Spool {
        /// The spool file path (or spool directory if creation failed).
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Re-reading a text body for decoding failed.
    #[error("failed to decode response body as {charset}: {source}")]
    Decode {
        /// Name of the charset the body was being decoded with.
        charset: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The request URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The request method is not a valid HTTP token.
    #[error("invalid HTTP method: {method}")]
    InvalidMethod {
        /// The rejected method string.
        method: String,
    },

    /// The request could not be sent or the response head never arrived.
    #[error("transport error for {url}: {source}")]
    Transport {
        /// The URL of the exchange.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

impl MapError {
    /// Creates a body drain error.
    pub fn drain(source: std::io::Error) -> Self {
        Self::Drain { source }
    }

    /// Creates a spool file error.
    pub fn spool(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Spool {
            path: path.into(),
            source,
        }
    }

    /// Creates a decode error.
    pub fn decode(charset: impl Into<String>, source: std::io::Error) -> Self {
        Self::Decode {
            charset: charset.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid method error.
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod {
            method: method.into(),
        }
    }

    /// Creates a transport error from a reqwest error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }
}

// No `From<std::io::Error>`; each call site picks its variant.
