//! The per-exchange pipeline: materialize, build, close.

use std::ops::{Deref, DerefMut};

use tracing::{debug, instrument};

use crate::body::{BodyStream, ByteSource, materialize};
use crate::config::MapperConfig;
use crate::cookies::Cookie;
use crate::descriptor::{ResponseDescriptor, build_descriptor};
use crate::error::MapError;

/// A received response whose head is available and whose body is still open.
pub trait Exchange: BodyStream {
    /// HTTP status code.
    fn status(&self) -> u16;

    /// Status message (reason phrase).
    fn message(&self) -> &str;

    /// Headers in the order received.
    fn headers(&self) -> &[(String, String)];

    /// Method of the request that produced this response.
    fn method(&self) -> &str;

    /// Declared body length, `None` if unknown.
    fn content_length(&self) -> Option<u64>;

    /// Releases the underlying transport resources.
    fn close(&mut self);
}

/// Owns an [`Exchange`] and closes it exactly once: on [`close`](Self::close)
/// or on drop, whichever comes first.
#[derive(Debug)]
pub struct ExchangeGuard<E: Exchange> {
    exchange: E,
    closed: bool,
}

impl<E: Exchange> ExchangeGuard<E> {
    /// Takes ownership of an open exchange.
    pub fn new(exchange: E) -> Self {
        Self {
            exchange,
            closed: false,
        }
    }

    /// Closes the exchange if it is still open.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.exchange.close();
        debug!("closed exchange");
    }

    /// Returns true once the exchange has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<E: Exchange> Deref for ExchangeGuard<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.exchange
    }
}

impl<E: Exchange> DerefMut for ExchangeGuard<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.exchange
    }
}

impl<E: Exchange> Drop for ExchangeGuard<E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Maps one exchange into a [`ResponseDescriptor`].
///
/// The exchange is closed before this returns, on success and on every error
/// path. `HEAD` responses are not drained.
///
/// # Errors
///
/// Returns the first fatal [`MapError`] from draining, spooling, or decoding.
#[instrument(skip_all, fields(status = exchange.status(), method = %exchange.method()))]
pub async fn map_exchange<E: Exchange>(
    exchange: E,
    cookies: Vec<Cookie>,
    config: &MapperConfig,
) -> Result<ResponseDescriptor, MapError> {
    let mut guard = ExchangeGuard::new(exchange);
    let result = map_open_exchange(&mut guard, cookies, config).await;
    guard.close();
    result
}

async fn map_open_exchange<E: Exchange>(
    guard: &mut ExchangeGuard<E>,
    cookies: Vec<Cookie>,
    config: &MapperConfig,
) -> Result<ResponseDescriptor, MapError> {
    let body = if guard.method().eq_ignore_ascii_case("HEAD") {
        ByteSource::empty()
    } else {
        let declared_length = guard.content_length();
        materialize(declared_length, &mut **guard, config).await?
    };

    let exchange: &E = guard;
    build_descriptor(
        exchange.status(),
        exchange.message(),
        exchange.headers(),
        exchange.method(),
        body,
        cookies,
    )
    .await
}
