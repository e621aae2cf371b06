//! Cookie records and the cookie store seam.
//!
//! The descriptor builder only ever reads a point-in-time snapshot from a
//! [`CookieStore`]; recording cookies is the transport driver's job.

mod session_store;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};
use url::Url;

pub use session_store::{SessionCookieStore, parse_set_cookie};

/// A cookie as seen by the cookie store for an exchange's target.
///
/// The value is redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    value: String,
    /// Path scope.
    pub path: String,
    /// Domain scope, without a leading dot.
    pub domain: String,
    /// Absolute expiry; `None` for session cookies. Serialized as epoch milliseconds.
    #[serde(serialize_with = "serialize_expiry")]
    pub expires: Option<SystemTime>,
    /// Only sent over HTTPS.
    pub secure: bool,
    /// Hidden from scripts.
    pub http_only: bool,
}

impl Cookie {
    /// Creates a cookie record.
    #[must_use]
    pub fn new(
        name: String,
        value: String,
        path: String,
        domain: String,
        expires: Option<SystemTime>,
        secure: bool,
        http_only: bool,
    ) -> Self {
        Self {
            name,
            value,
            path,
            domain,
            expires,
            secure,
            http_only,
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if the cookie expired at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|expiry| expiry <= now)
    }

    /// Returns true if this cookie would be sent to `url`.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        domain_matches(&host.to_ascii_lowercase(), &self.domain)
            && path_matches(url.path(), &self.path)
            && (!self.secure || url.scheme() == "https")
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("path", &self.path)
            .field("domain", &self.domain)
            .field("expires", &self.expires)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .finish()
    }
}

fn serialize_expiry<S: Serializer>(
    expires: &Option<SystemTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match expires {
        Some(expiry) => {
            let millis = expiry
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
            serializer.serialize_some(&millis)
        }
        None => serializer.serialize_none(),
    }
}

/// Source of cookie snapshots for an exchange.
pub trait CookieStore: Send + Sync {
    /// Records the `Set-Cookie` headers of a response received from `url`.
    fn store_response_cookies(&self, url: &Url, headers: &[(String, String)]);

    /// Returns the unexpired cookies that apply to `url`, in store order.
    fn snapshot(&self, url: &Url) -> Vec<Cookie>;
}

/// Host/domain match: exact, or a subdomain on a dot boundary.
pub(crate) fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Path match: exact, or a prefix ending at a `/` boundary.
pub(crate) fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}
