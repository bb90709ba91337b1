//! Lightweight HTTP client over a pluggable, event-driven transport.
//!
//! # Overview
//! `FetchPlease` exposes GET/PUT/POST/DELETE convenience methods, validates
//! response status codes, decodes JSON responses, and tracks in-flight
//! requests so they can be cancelled in bulk with `abort`.
//!
//! # Design
//! - The network lives behind the `Transport` trait. A handle is opened,
//!   configured and sent, then reports exactly one terminal event (load,
//!   error, abort, timeout). The client never does I/O itself; the
//!   `fetch-please-ureq` crate supplies a real transport and `fake` an
//!   in-memory one.
//! - `request` returns as soon as the body is handed to the transport. The
//!   returned `ResponseFuture` runs the fixed post-processing chain: status
//!   check, JSON decoding, error handler. Each stage can be replaced per call
//!   through `RequestOptions`.
//! - Base path and request path are concatenated verbatim; callers own slash
//!   placement.

pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod fake;
pub mod http;
pub mod merge;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod transport;

pub use body::{Body, FormData, IntoBody, Json};
pub use client::{FetchPlease, PendingRequest, ResponseFuture};
pub use config::{ClientConfig, DefaultHeaders};
pub use error::FetchError;
pub use http::{Fields, Headers, HttpMethod, Params, Scalar};
pub use pipeline::{Payload, RequestOptions};
pub use registry::RequestId;
pub use transport::{Handle, Progress, Transport, TransportEvent, TransportFactory};
