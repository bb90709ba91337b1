//! The transport contract the client drives.
//!
//! # Design
//! A transport handle models one request/response exchange the way a
//! browser XHR object does: it is opened, configured header by header, sent,
//! and later reports exactly one terminal event. The client holds handles
//! behind `Arc` in two places at once (the caller's `PendingRequest` and the
//! pending registry), so every method takes `&self` and implementations use
//! interior mutability.
//!
//! Implementations must invoke listeners without holding their own locks:
//! the client's load listener calls `status()` on the same handle.
//!
//! Call order the client guarantees: listeners, `open`, headers, timeout,
//! `send`. `abort` may come at any time after `send`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::body::Body;
use crate::http::HttpMethod;

/// Terminal event of a transport handle. Exactly one fires per handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Load,
    Error,
    Abort,
    Timeout,
}

/// Transfer progress for either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

pub type EventListener = Arc<dyn Fn(TransportEvent) + Send + Sync>;
pub type ProgressListener = Arc<dyn Fn(Progress) + Send + Sync>;

/// One in-flight or completed HTTP exchange.
pub trait Transport: Send + Sync + fmt::Debug {
    fn on_event(&self, listener: EventListener);

    /// Download progress.
    fn on_progress(&self, listener: ProgressListener);

    fn on_upload_progress(&self, listener: ProgressListener);

    fn open(&self, method: HttpMethod, url: &str);

    fn set_request_header(&self, name: &str, value: &str);

    /// `Duration::ZERO` disables the timeout.
    fn set_timeout(&self, timeout: Duration);

    /// Transmit the request. Must not block on the network.
    fn send(&self, body: Body);

    /// Cancel the exchange. Fires `Abort` unless already terminal.
    fn abort(&self);

    /// Response status, `0` until a response has arrived.
    fn status(&self) -> u16;

    fn response_text(&self) -> String;

    /// Case-insensitive response header lookup.
    fn response_header(&self, name: &str) -> Option<String>;
}

/// Shared handle to a transport.
pub type Handle = Arc<dyn Transport>;

/// Creates a fresh transport handle per request.
pub type TransportFactory = Arc<dyn Fn() -> Handle + Send + Sync>;

/// Wrap a closure as a `TransportFactory`.
pub fn factory<F>(f: F) -> TransportFactory
where
    F: Fn() -> Handle + Send + Sync + 'static,
{
    Arc::new(f)
}
