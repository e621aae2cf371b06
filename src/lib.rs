//! Response Mapper Library
//!
//! Turns a completed HTTP response into a structured, serialization-ready
//! [`ResponseDescriptor`], deciding per response whether the body is held in
//! memory or spooled to a temporary file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`body`] - Body materialization into a re-readable [`ByteSource`]
//! - [`content_type`] - Text/binary classification and charset resolution
//! - [`headers`] - Header normalization and the transport skip-set
//! - [`cookies`] - Cookie records and the cookie store seam
//! - [`descriptor`] - The structured response record and its builder
//! - [`exchange`] - The per-exchange pipeline with guaranteed close
//! - [`transport`] - reqwest-backed exchanges and a thin fetch client

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod body;
pub mod config;
pub mod content_type;
pub mod cookies;
pub mod descriptor;
pub mod error;
pub mod exchange;
pub mod headers;
pub mod transport;

// Re-export commonly used types
pub use body::{BodyStream, ByteSource, SpooledFile, materialize, purge_spooled_files};
pub use config::{MAX_IN_MEMORY_BODY_STREAM_BYTES, MapperConfig};
pub use content_type::{Charset, is_text_content, resolve_charset};
pub use cookies::{Cookie, CookieStore, SessionCookieStore};
pub use descriptor::{ResponseDescriptor, build_descriptor};
pub use error::MapError;
pub use exchange::{Exchange, ExchangeGuard, map_exchange};
pub use headers::{ResponseHeaders, SKIP_HEADERS, normalize_headers};
pub use transport::{FetchClient, ReqwestExchange};
