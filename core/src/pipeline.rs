//! Response post-processing and per-request options.
//!
//! # Design
//! Every settled request runs the same fixed chain: status check, JSON
//! decoding, error handling. Each link is a plain function with a default
//! implementation exported from this module; `RequestOptions` can swap any
//! of them out per call without changing the order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::http::Headers;
use crate::transport::{Handle, Progress, ProgressListener};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const MIN_SUCCESSFUL_HTTP_CODE: u16 = 200;
pub const MAX_SUCCESSFUL_HTTP_CODE: u16 = 299;

/// What a request resolves to.
#[derive(Debug, Clone)]
pub enum Payload {
    /// The response declared `application/json` and parsed.
    Json(serde_json::Value),
    /// Any other response, handed back as the transport handle.
    Raw(Handle),
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    /// Deserialize a JSON payload into `T`.
    ///
    /// A raw payload is parsed from its body text instead.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        let result = match self {
            Payload::Json(value) => T::deserialize(value),
            Payload::Raw(handle) => serde_json::from_str(&handle.response_text()),
        };
        result.map_err(|e| FetchError::JsonParseError(e.to_string()))
    }

    /// Response body text for raw payloads.
    pub fn text(&self) -> Option<String> {
        match self {
            Payload::Json(_) => None,
            Payload::Raw(handle) => Some(handle.response_text()),
        }
    }

    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Payload::Json(_) => None,
            Payload::Raw(handle) => Some(handle),
        }
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Json(a), Payload::Json(b)) => a == b,
            (Payload::Raw(a), Payload::Raw(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

pub type ResponseStage = Arc<dyn Fn(Handle) -> Result<Handle, FetchError> + Send + Sync>;
pub type JsonStage = Arc<dyn Fn(Handle) -> Result<Payload, FetchError> + Send + Sync>;
pub type ErrorStage = Arc<dyn Fn(FetchError) -> Result<Payload, FetchError> + Send + Sync>;

/// Reject any status outside 200..=299.
pub fn handle_response(handle: Handle) -> Result<Handle, FetchError> {
    let status = handle.status();
    if !(MIN_SUCCESSFUL_HTTP_CODE..=MAX_SUCCESSFUL_HTTP_CODE).contains(&status) {
        return Err(FetchError::UnacceptableHttpCode(status));
    }
    Ok(handle)
}

/// Parse the body as JSON when `Content-Type` mentions `application/json`.
pub fn handle_json(handle: Handle) -> Result<Payload, FetchError> {
    let content_type = handle
        .response_header("Content-Type")
        .unwrap_or_default()
        .to_lowercase();

    if !content_type.contains(CONTENT_TYPE_JSON) {
        return Ok(Payload::Raw(handle));
    }

    serde_json::from_str(&handle.response_text())
        .map(Payload::Json)
        .map_err(|e| FetchError::JsonParseError(e.to_string()))
}

/// Re-raise unchanged.
pub fn handle_error(error: FetchError) -> Result<Payload, FetchError> {
    Err(error)
}

/// The three stages applied to a settled request, in order.
#[derive(Clone)]
pub(crate) struct Pipeline {
    pub(crate) handle_response: ResponseStage,
    pub(crate) handle_json: JsonStage,
    pub(crate) handle_error: ErrorStage,
}

impl Pipeline {
    pub(crate) fn run(&self, settled: Result<Handle, FetchError>) -> Result<Payload, FetchError> {
        settled
            .and_then(|handle| (self.handle_response)(handle))
            .and_then(|handle| (self.handle_json)(handle))
            .or_else(|error| (self.handle_error)(error))
    }
}

/// Per-request overrides.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Overlaid on the client's default headers.
    pub headers: Headers,
    /// Takes precedence over the client timeout when non-zero.
    pub timeout: Duration,
    pub handle_response: Option<ResponseStage>,
    pub handle_json: Option<JsonStage>,
    pub handle_error: Option<ErrorStage>,
    pub on_progress: Option<ProgressListener>,
    pub on_upload_progress: Option<ProgressListener>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("handle_response", &self.handle_response.is_some())
            .field("handle_json", &self.handle_json.is_some())
            .field("handle_error", &self.handle_error.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .finish()
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn handle_response<F>(mut self, f: F) -> Self
    where
        F: Fn(Handle) -> Result<Handle, FetchError> + Send + Sync + 'static,
    {
        self.handle_response = Some(Arc::new(f));
        self
    }

    pub fn handle_json<F>(mut self, f: F) -> Self
    where
        F: Fn(Handle) -> Result<Payload, FetchError> + Send + Sync + 'static,
    {
        self.handle_json = Some(Arc::new(f));
        self
    }

    pub fn handle_error<F>(mut self, f: F) -> Self
    where
        F: Fn(FetchError) -> Result<Payload, FetchError> + Send + Sync + 'static,
    {
        self.handle_error = Some(Arc::new(f));
        self
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn on_upload_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(f));
        self
    }

    pub(crate) fn pipeline(&self) -> Pipeline {
        Pipeline {
            handle_response: self
                .handle_response
                .clone()
                .unwrap_or_else(|| Arc::new(handle_response) as ResponseStage),
            handle_json: self
                .handle_json
                .clone()
                .unwrap_or_else(|| Arc::new(handle_json) as JsonStage),
            handle_error: self
                .handle_error
                .clone()
                .unwrap_or_else(|| Arc::new(handle_error) as ErrorStage),
        }
    }
}
