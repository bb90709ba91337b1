//! In-memory transport for tests.
//!
//! `FakeServer` hands out `FakeTransport` handles through its factory and
//! remembers every one it created, so a test can issue a request through the
//! client and then drive the exchange by hand: `respond`, `fail`,
//! `time_out`, or `abort`. Nothing touches the network.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::body::Body;
use crate::http::HttpMethod;
use crate::transport::{
    EventListener, Handle, Progress, ProgressListener, Transport, TransportEvent, TransportFactory,
};

/// Calls made on a fake handle, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    SetHeader(String),
    SetTimeout,
    Send,
    Abort,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    method: Option<HttpMethod>,
    url: Option<String>,
    request_headers: Vec<(String, String)>,
    timeout: Duration,
    body: Option<Body>,
    status: u16,
    response_headers: Vec<(String, String)>,
    response_text: String,
    terminal: Option<TransportEvent>,
    listeners: Vec<EventListener>,
    progress: Vec<ProgressListener>,
    upload_progress: Vec<ProgressListener>,
    fail_on_send: bool,
}

/// A transport whose response is scripted by the test.
#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<State>,
}

impl std::fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeTransport")
            .field("method", &state.method)
            .field("url", &state.url)
            .field("status", &state.status)
            .field("terminal", &state.terminal)
            .finish_non_exhaustive()
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that reports `Error` from inside `send`.
    pub fn failing_on_send() -> Self {
        let transport = Self::default();
        transport.lock().fail_on_send = true;
        transport
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fire `event` to every listener unless a terminal event already fired.
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

    /// Complete the exchange with a response and fire `Load`.
    pub fn respond(&self, status: u16, headers: &[(&str, &str)], body: &str) {
        let downloads = {
            let mut state = self.lock();
            if state.terminal.is_some() {
                return;
            }
            state.status = status;
            state.response_headers = headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            state.response_text = body.to_string();
            state.progress.clone()
        };
        let total = body.len() as u64;
        for listener in downloads {
            listener(Progress {
                loaded: total,
                total: Some(total),
            });
        }
        self.finish(TransportEvent::Load);
    }

    /// Fire a `Load` with no status, as some engines do for aborted or
    /// cross-origin exchanges. Does not make the handle terminal.
    pub fn load_without_status(&self) {
        let listeners = self.lock().listeners.clone();
        for listener in listeners {
            listener(TransportEvent::Load);
        }
    }

    /// Simulate a network failure.
    pub fn fail(&self) {
        self.finish(TransportEvent::Error);
    }

    pub fn time_out(&self) {
        self.finish(TransportEvent::Timeout);
    }

    /// Report upload progress to the upload listeners.
    pub fn upload(&self, loaded: u64, total: Option<u64>) {
        let listeners = self.lock().upload_progress.clone();
        for listener in listeners {
            listener(Progress { loaded, total });
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn method(&self) -> Option<HttpMethod> {
        self.lock().method
    }

    pub fn url(&self) -> Option<String> {
        self.lock().url.clone()
    }

    pub fn request_headers(&self) -> Vec<(String, String)> {
        self.lock().request_headers.clone()
    }

    pub fn request_header(&self, name: &str) -> Option<String> {
        self.lock()
            .request_headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    pub fn timeout(&self) -> Duration {
        self.lock().timeout
    }

    /// Body passed to `send`, `None` if never sent.
    pub fn body(&self) -> Option<Body> {
        self.lock().body.clone()
    }

    pub fn terminal(&self) -> Option<TransportEvent> {
        self.lock().terminal
    }
}

impl Transport for FakeTransport {
    fn on_event(&self, listener: EventListener) {
        self.lock().listeners.push(listener);
    }

    fn on_progress(&self, listener: ProgressListener) {
        self.lock().progress.push(listener);
    }

    fn on_upload_progress(&self, listener: ProgressListener) {
        self.lock().upload_progress.push(listener);
    }

    fn open(&self, method: HttpMethod, url: &str) {
        let mut state = self.lock();
        state.calls.push(Call::Open);
        state.method = Some(method);
        state.url = Some(url.to_string());
    }

    fn set_request_header(&self, name: &str, value: &str) {
        let mut state = self.lock();
        state.calls.push(Call::SetHeader(name.to_string()));
        state.request_headers.push((name.to_string(), value.to_string()));
    }

    fn set_timeout(&self, timeout: Duration) {
        let mut state = self.lock();
        state.calls.push(Call::SetTimeout);
        state.timeout = timeout;
    }

    fn send(&self, body: Body) {
        let fail = {
            let mut state = self.lock();
            state.calls.push(Call::Send);
            state.body = Some(body);
            state.fail_on_send
        };
        if fail {
            self.fail();
        }
    }

    fn abort(&self) {
        self.lock().calls.push(Call::Abort);
        self.finish(TransportEvent::Abort);
    }

    fn status(&self) -> u16 {
        self.lock().status
    }

    fn response_text(&self) -> String {
        self.lock().response_text.clone()
    }

    fn response_header(&self, name: &str) -> Option<String> {
        self.lock()
            .response_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

/// Factory for `FakeTransport` handles that keeps every handle it created.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    created: Arc<Mutex<Vec<Arc<FakeTransport>>>>,
    fail_on_send: bool,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every handle it creates fails synchronously when sent.
    pub fn failing_on_send() -> Self {
        Self {
            fail_on_send: true,
            ..Self::default()
        }
    }

    /// A `TransportFactory` that records each handle it creates.
    pub fn factory(&self) -> TransportFactory {
        let created = Arc::clone(&self.created);
        let fail_on_send = self.fail_on_send;
        Arc::new(move || {
            let transport = Arc::new(if fail_on_send {
                FakeTransport::failing_on_send()
            } else {
                FakeTransport::new()
            });
            created
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Arc::clone(&transport));
            transport as Handle
        })
    }

    /// Every handle created so far, in creation order.
    pub fn requests(&self) -> Vec<Arc<FakeTransport>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Arc<FakeTransport>> {
        self.requests().pop()
    }

    pub fn count(&self) -> usize {
        self.created.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
