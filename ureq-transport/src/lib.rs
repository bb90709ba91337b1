//! Blocking `ureq` transport for `fetch-please`, driven on Tokio's blocking
//! pool.
//!
//! # Design
//! `send` hands the whole exchange to `spawn_blocking` and returns
//! immediately. The blocking task runs the request with a fresh agent (no
//! connection pooling; the agent carries the per-request timeout), reads the
//! body to a string, stores the response and fires `Load`. Status codes are
//! never treated as errors here; the client decides what is acceptable.
//!
//! `abort` marks the handle terminal and fires `Abort` right away. The
//! blocking task cannot be interrupted, so its eventual result is discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fetch_please::transport::{EventListener, ProgressListener};
use fetch_please::{
    Body, ClientConfig, Handle, HttpMethod, Progress, Transport, TransportEvent, TransportFactory,
};

/// A `TransportFactory` producing `UreqTransport` handles.
pub fn factory() -> TransportFactory {
    Arc::new(|| Arc::new(UreqTransport::new()) as Handle)
}

/// Client configuration wired to this transport.
pub fn config(base_path: impl Into<String>) -> ClientConfig {
    ClientConfig::new(base_path).with_transport(factory())
}

#[derive(Default)]
struct State {
    method: Option<HttpMethod>,
    url: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Duration,
    status: u16,
    response_headers: Vec<(String, String)>,
    response_text: String,
    terminal: Option<TransportEvent>,
    listeners: Vec<EventListener>,
    progress: Vec<ProgressListener>,
    upload_progress: Vec<ProgressListener>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
}

/// What the blocking task brings back.
struct Exchange {
    status: u16,
    headers: Vec<(String, String)>,
    text: String,
    sent: u64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, event: TransportEvent) {
        let listeners = {
            let mut state = self.lock();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(event);
            state.listeners.clone()
        };
        for listener in listeners {
            listener(event);
        }
    }

    fn complete(&self, exchange: Exchange) {
        let (uploads, downloads) = {
            let mut state = self.lock();
            if state.terminal.is_some() {
                tracing::trace!(status = exchange.status, "discarding response of settled request");
                return;
            }
            state.status = exchange.status;
            state.response_headers = exchange.headers;
            state.response_text = exchange.text;
            (state.upload_progress.clone(), state.progress.clone())
        };
        for listener in uploads {
            listener(Progress {
                loaded: exchange.sent,
                total: Some(exchange.sent),
            });
        }
        let (loaded, total) = {
            let state = self.lock();
            let total = header(&state.response_headers, "content-length")
                .and_then(|v| v.trim().parse::<u64>().ok());
            (state.response_text.len() as u64, total)
        };
        for listener in downloads {
            listener(Progress { loaded, total });
        }
        self.finish(TransportEvent::Load);
    }
}

fn header(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
}

/// One HTTP exchange executed with `ureq`.
#[derive(Default)]
pub struct UreqTransport {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("UreqTransport")
            .field("method", &state.method)
            .field("url", &state.url)
            .field("status", &state.status)
            .field("terminal", &state.terminal)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for UreqTransport {
    fn on_event(&self, listener: EventListener) {
        self.inner.lock().listeners.push(listener);
    }

    fn on_progress(&self, listener: ProgressListener) {
        self.inner.lock().progress.push(listener);
    }

    fn on_upload_progress(&self, listener: ProgressListener) {
        self.inner.lock().upload_progress.push(listener);
    }

    fn open(&self, method: HttpMethod, url: &str) {
        let mut state = self.inner.lock();
        state.method = Some(method);
        state.url = Some(url.to_string());
    }

    fn set_request_header(&self, name: &str, value: &str) {
        self.inner
            .lock()
            .headers
            .push((name.to_string(), value.to_string()));
    }

    fn set_timeout(&self, timeout: Duration) {
        self.inner.lock().timeout = timeout;
    }

    fn send(&self, body: Body) {
        let request = {
            let state = self.inner.lock();
            match (state.method, state.url.clone()) {
                (Some(method), Some(url)) => Some((method, url, state.headers.clone(), state.timeout)),
                _ => None,
            }
        };
        let Some((method, url, headers, timeout)) = request else {
            tracing::warn!("send called before open");
            self.inner.finish(TransportEvent::Error);
            return;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "no Tokio runtime to drive the request");
                self.inner.finish(TransportEvent::Error);
                return;
            }
        };

        let inner = Arc::clone(&self.inner);
        runtime.spawn_blocking(move || match execute(method, &url, &headers, timeout, body) {
            Ok(exchange) => inner.complete(exchange),
            Err(event) => inner.finish(event),
        });
    }

    fn abort(&self) {
        self.inner.finish(TransportEvent::Abort);
    }

    fn status(&self) -> u16 {
        self.inner.lock().status
    }

    fn response_text(&self) -> String {
        self.inner.lock().response_text.clone()
    }

    fn response_header(&self, name: &str) -> Option<String> {
        header(&self.inner.lock().response_headers, name)
    }
}

/// Run one request to completion on the current (blocking) thread.
fn execute(
    method: HttpMethod,
    url: &str,
    headers: &[(String, String)],
    timeout: Duration,
    body: Body,
) -> Result<Exchange, TransportEvent> {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global((!timeout.is_zero()).then_some(timeout))
        .build()
        .new_agent();

    let sent = body.len() as u64;
    let result = match (method, body.is_null()) {
        (HttpMethod::Get, true) => with_headers(agent.get(url), headers).call(),
        (HttpMethod::Delete, true) => with_headers(agent.delete(url), headers).call(),
        (HttpMethod::Get, false) => send(with_headers(agent.get(url), headers).force_send_body(), body),
        (HttpMethod::Delete, false) => {
            send(with_headers(agent.delete(url), headers).force_send_body(), body)
        }
        (HttpMethod::Put, _) => send(with_headers(agent.put(url), headers), body),
        (HttpMethod::Post, _) => send(with_headers(agent.post(url), headers), body),
    };

    let mut response = result.map_err(classify)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let text = response.body_mut().read_to_string().map_err(classify)?;

    Ok(Exchange {
        status,
        headers,
        text,
        sent,
    })
}

fn with_headers<B>(
    mut request: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

fn send(
    request: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Body,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Body::Null => request.send_empty(),
        Body::Text(text) => request.send(text.as_bytes()),
        Body::Form(form) => request.send_form(form.iter()),
        Body::Blob(bytes) => request.send(&bytes[..]),
    }
}

fn classify(error: ureq::Error) -> TransportEvent {
    tracing::debug!(error = %error, "ureq request failed");
    match error {
        ureq::Error::Timeout(_) => TransportEvent::Timeout,
        _ => TransportEvent::Error,
    }
}
