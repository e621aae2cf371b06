//! reqwest-backed exchanges and a thin fetch client.
//!
//! Request construction stays minimal: a method and a URL, no body, no
//! retries. Redirects follow reqwest defaults. The session cookie store is the
//! client's cookie provider, so cookies set on intermediate redirect hops are
//! recorded and replayed on the next hop.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, Method};
use tracing::{debug, info, instrument};
use url::Url;

use crate::body::BodyStream;
use crate::config::MapperConfig;
use crate::cookies::{CookieStore, SessionCookieStore};
use crate::descriptor::ResponseDescriptor;
use crate::error::MapError;
use crate::exchange::{Exchange, map_exchange};

/// Default connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default overall request timeout in seconds.
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default User-Agent sent by [`FetchClient`].
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("response-mapper/{version} (http-response-mapper)")
}

type ChunkStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// A [`reqwest::Response`] viewed as an [`Exchange`].
///
/// The status message is the canonical reason phrase for the status code, or
/// `""` when the code has none. HTTP/2 carries no reason phrase and hyper does
/// not expose the HTTP/1 one, so a custom phrase sent by the server is lost.
pub struct ReqwestExchange {
    url: Url,
    method: String,
    status: u16,
    message: String,
    headers: Vec<(String, String)>,
    content_length: Option<u64>,
    body: Option<ChunkStream>,
}

impl ReqwestExchange {
    /// Captures the response head and takes over its body stream.
    ///
    /// Header names arrive lowercased from hyper; values that are not valid
    /// visible ASCII are decoded lossily as UTF-8.
    #[must_use]
    pub fn new(method: &str, response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = value.to_str().map_or_else(
                    |_| String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    str::to_string,
                );
                (name.as_str().to_string(), value)
            })
            .collect();

        Self {
            url: response.url().clone(),
            method: method.to_string(),
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            content_length: response.content_length(),
            body: Some(Box::pin(response.bytes_stream())),
        }
    }

    /// Final URL of the response, after redirects.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl BodyStream for ReqwestExchange {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let Some(stream) = self.body.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(error)) => Err(io::Error::other(error)),
            None => Ok(None),
        }
    }
}

impl Exchange for ReqwestExchange {
    fn status(&self) -> u16 {
        self.status
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn close(&mut self) {
        // Dropping the stream releases the connection.
        self.body = None;
    }
}

/// Sends requests and maps their responses, keeping cookies across calls.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    cookies: Arc<SessionCookieStore>,
    config: MapperConfig,
}

impl FetchClient {
    /// Creates a client with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns a reqwest error if the underlying client cannot be built.
    pub fn new(config: MapperConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(config, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeouts in seconds.
    ///
    /// # Errors
    ///
    /// Returns a reqwest error if the underlying client cannot be built.
    pub fn with_timeouts(
        config: MapperConfig,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let cookies = Arc::new(SessionCookieStore::new());
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(default_user_agent())
            .cookie_provider(Arc::clone(&cookies))
            .build()?;
        Ok(Self {
            client,
            cookies,
            config,
        })
    }

    /// The cookie store shared by all requests from this client.
    #[must_use]
    pub fn cookie_store(&self) -> &Arc<SessionCookieStore> {
        &self.cookies
    }

    /// The mapping configuration applied to every response.
    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Sends `method url` and maps the response.
    ///
    /// Non-success statuses are mapped like any other response.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidUrl`] or [`MapError::InvalidMethod`] for bad
    /// input, [`MapError::Transport`] if no response arrives, and any
    /// materialization or decode error from [`map_exchange`].
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, method: &str, url: &str) -> Result<ResponseDescriptor, MapError> {
        let parsed = Url::parse(url).map_err(|_| MapError::invalid_url(url))?;
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| MapError::invalid_method(method))?;

        debug!("sending request");
        let response = self
            .client
            .request(method.clone(), parsed)
            .send()
            .await
            .map_err(|e| MapError::transport(url, e))?;
        let exchange = ReqwestExchange::new(method.as_str(), response);
        let snapshot = self.cookies.snapshot(exchange.url());

        let descriptor = map_exchange(exchange, snapshot, &self.config).await?;
        info!(
            status = descriptor.status(),
            bytes = descriptor.body_source().len(),
            spooled = !descriptor.body_source().is_in_memory(),
            "response mapped"
        );
        Ok(descriptor)
    }
}
