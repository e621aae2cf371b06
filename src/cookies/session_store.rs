//! In-memory cookie store fed from `Set-Cookie` headers.
//!
//! Installed on the reqwest client as its cookie provider, so every hop of a
//! redirect chain records and replays cookies. Values are parsed with the
//! `cookie` crate reqwest itself uses. The descriptor reports `Domain`,
//! `Path`, `Expires`, `Max-Age`, `Secure` and `HttpOnly`; everything else is
//! ignored.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderValue;
use tracing::{debug, instrument};
use url::Url;

use super::{Cookie, CookieStore, domain_matches};

/// Session-lifetime cookie store, internally synchronized.
///
/// Cookies keep insertion order; a cookie with the same name, domain, and
/// path replaces the existing one in place.
#[derive(Debug, Default)]
pub struct SessionCookieStore {
    cookies: Mutex<Vec<Cookie>>,
}

impl SessionCookieStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Cookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cookies held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if the store holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes all cookies.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Records `Set-Cookie` headers as of `now`.
    pub fn store_response_cookies_at(
        &self,
        url: &Url,
        headers: &[(String, String)],
        now: SystemTime,
    ) {
        let values = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
            .map(|(_, value)| value.as_str());
        self.store_set_cookie_values(url, values, now);
    }

    fn store_set_cookie_values<'a>(
        &self,
        url: &Url,
        values: impl Iterator<Item = &'a str>,
        now: SystemTime,
    ) {
        let mut cookies = self.lock();
        for value in values {
            let Some(cookie) = parse_set_cookie(value, url, now) else {
                continue;
            };

            let existing = cookies.iter().position(|c| {
                c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path
            });
            if cookie.is_expired_at(now) {
                if let Some(index) = existing {
                    cookies.remove(index);
                    debug!(name = %cookie.name, domain = %cookie.domain, "removed expired cookie");
                }
                continue;
            }

            debug!(name = %cookie.name, domain = %cookie.domain, path = %cookie.path, "stored cookie");
            match existing {
                Some(index) => cookies[index] = cookie,
                None => cookies.push(cookie),
            }
        }
    }

    /// Cookies applicable to `url` as of `now`.
    #[must_use]
    pub fn snapshot_at(&self, url: &Url, now: SystemTime) -> Vec<Cookie> {
        self.lock()
            .iter()
            .filter(|c| !c.is_expired_at(now) && c.matches(url))
            .cloned()
            .collect()
    }

    /// Builds a `Cookie` request header value for `url`, if any cookie applies.
    #[must_use]
    pub fn request_header(&self, url: &Url) -> Option<HeaderValue> {
        let cookies = self.snapshot(url);
        if cookies.is_empty() {
            return None;
        }
        let joined = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value()))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}

impl CookieStore for SessionCookieStore {
    #[instrument(level = "debug", skip(self, headers), fields(url = %url))]
    fn store_response_cookies(&self, url: &Url, headers: &[(String, String)]) {
        self.store_response_cookies_at(url, headers, SystemTime::now());
    }

    fn snapshot(&self, url: &Url) -> Vec<Cookie> {
        self.snapshot_at(url, SystemTime::now())
    }
}

impl reqwest::cookie::CookieStore for SessionCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let values = cookie_headers.filter_map(|value| value.to_str().ok());
        self.store_set_cookie_values(url, values, SystemTime::now());
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.request_header(url)
    }
}

/// Parses one `Set-Cookie` header value received from `url`.
///
/// Returns `None` for values without a `name=value` pair, or whose `Domain`
/// does not cover the request host. `Max-Age` takes precedence over `Expires`;
/// a non-positive `Max-Age` yields a cookie that is already expired.
#[must_use]
pub fn parse_set_cookie(raw: &str, url: &Url, now: SystemTime) -> Option<Cookie> {
    let host = url.host_str()?.to_ascii_lowercase();
    let parsed = match cookie::Cookie::parse(raw.trim()) {
        Ok(parsed) => parsed,
        Err(error) => {
            debug!(error = %error, "ignoring malformed Set-Cookie");
            return None;
        }
    };

    let domain = match parsed.domain().map(str::to_ascii_lowercase) {
        Some(d) if d.is_empty() => host,
        Some(d) if domain_matches(&host, &d) => d,
        Some(d) => {
            debug!(cookie = %parsed.name(), domain = %d, host = %host, "rejecting cookie for foreign domain");
            return None;
        }
        None => host,
    };

    let path = parsed
        .path()
        .filter(|p| p.starts_with('/'))
        .map_or_else(|| default_path(url), str::to_string);

    let expires = match parsed.max_age() {
        Some(max_age) if max_age.whole_seconds() <= 0 => Some(UNIX_EPOCH),
        Some(max_age) => {
            now.checked_add(Duration::from_secs(max_age.whole_seconds().unsigned_abs()))
        }
        None => parsed.expires_datetime().map(SystemTime::from),
    };

    Some(Cookie::new(
        parsed.name().to_string(),
        parsed.value().to_string(),
        path,
        domain,
        expires,
        parsed.secure().unwrap_or(false),
        parsed.http_only().unwrap_or(false),
    ))
}

/// Directory of the request path, per RFC 6265 section 5.1.4.
fn default_path(url: &Url) -> String {
    url.path()
        .rsplit_once('/')
        .map_or("/", |(dir, _)| if dir.is_empty() { "/" } else { dir })
        .to_string()
}
