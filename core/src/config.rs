//! Client-level configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::http::Headers;
use crate::transport::TransportFactory;

pub const ENV_BASE_PATH: &str = "FETCH_PLEASE_BASE_PATH";
pub const ENV_TIMEOUT_MS: &str = "FETCH_PLEASE_TIMEOUT_MS";

/// Headers sent with every request, either fixed or computed per request.
#[derive(Clone)]
pub enum DefaultHeaders {
    Static(Headers),
    Dynamic(Arc<dyn Fn() -> Headers + Send + Sync>),
}

impl DefaultHeaders {
    pub fn resolve(&self) -> Headers {
        match self {
            DefaultHeaders::Static(headers) => headers.clone(),
            DefaultHeaders::Dynamic(f) => f(),
        }
    }
}

impl Default for DefaultHeaders {
    fn default() -> Self {
        DefaultHeaders::Static(Headers::new())
    }
}

impl fmt::Debug for DefaultHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultHeaders::Static(headers) => f.debug_tuple("Static").field(headers).finish(),
            DefaultHeaders::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Settings shared by every request a `FetchPlease` issues.
///
/// Fields are public and may be changed after the client is built; nothing
/// re-validates them.
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Prefix concatenated verbatim in front of every request path.
    pub base_path: String,
    /// `Duration::ZERO` means no timeout.
    pub timeout: Duration,
    pub headers: DefaultHeaders,
    /// Without a factory every request fails with `TransportUnavailable`.
    pub transport_factory: Option<TransportFactory>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_path", &self.base_path)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("transport_factory", &self.transport_factory.is_some())
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// Read `FETCH_PLEASE_BASE_PATH` and `FETCH_PLEASE_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Same as `from_env`, over an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            match key.as_ref() {
                ENV_BASE_PATH => config.base_path = value.as_ref().to_string(),
                ENV_TIMEOUT_MS => match value.as_ref().trim().parse::<u64>() {
                    Ok(ms) => config.timeout = Duration::from_millis(ms),
                    Err(e) => tracing::warn!(
                        value = value.as_ref(),
                        error = %e,
                        "ignoring unparseable {ENV_TIMEOUT_MS}"
                    ),
                },
                _ => {}
            }
        }
        config
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = DefaultHeaders::Static(headers);
        self
    }

    /// Compute default headers on every request, e.g. to pick up a fresh token.
    pub fn with_headers_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Headers + Send + Sync + 'static,
    {
        self.headers = DefaultHeaders::Dynamic(Arc::new(f));
        self
    }

    pub fn with_transport(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = Some(factory);
        self
    }
}
