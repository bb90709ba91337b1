//! The request orchestration behind every verb method.
//!
//! # Design
//! `FetchPlease` holds a `ClientConfig` and the registry of in-flight
//! requests. `request` is synchronous up to and including transmission: it
//! creates a transport handle, wires its terminal events into a one-shot
//! channel, opens it, sets headers and timeout, sends the body, registers the
//! handle, and returns immediately. The caller awaits `result` if and when it
//! cares.
//!
//! Deregistration happens inside the event listener at the moment of
//! settlement, before the result is delivered. The registry therefore stays
//! accurate even for requests nobody awaits, and `abort` leaves it empty as
//! soon as every handle has reported its `Abort` event. The remaining stages
//! (status check, JSON decoding, error handler) run when the result is
//! polled.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::body::{Body, IntoBody};
use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::http::{HttpMethod, Params};
use crate::merge;
use crate::pipeline::{Payload, RequestOptions};
use crate::query;
use crate::registry::{Registry, RequestId};
use crate::transport::{Handle, TransportEvent, TransportFactory};

/// Eventual outcome of a request, after the post-processing stages.
pub struct ResponseFuture {
    inner: Pin<Box<dyn Future<Output = Result<Payload, FetchError>> + Send>>,
}

impl ResponseFuture {
    fn new(future: impl Future<Output = Result<Payload, FetchError>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(future),
        }
    }
}

impl Future for ResponseFuture {
    type Output = Result<Payload, FetchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture").finish_non_exhaustive()
    }
}

/// A transmitted request: its id, its transport handle and its result.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: RequestId,
    pub handle: Handle,
    pub result: ResponseFuture,
}

/// HTTP client over a pluggable transport.
#[derive(Debug, Default)]
pub struct FetchPlease {
    config: ClientConfig,
    registry: Registry,
}

impl FetchPlease {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            registry: Registry::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Low-level entry point behind every verb method.
    ///
    /// Fails synchronously, before any transport handle exists, with
    /// `TransportUnavailable`, `AsyncPrimitiveUnavailable` or
    /// `UnknownMethod`, checked in that order. `InvalidData` is reported
    /// after the handle is opened; that handle is never registered.
    pub fn request(
        &self,
        method: &str,
        path: &str,
        body: impl IntoBody,
        options: RequestOptions,
    ) -> Result<PendingRequest, FetchError> {
        let factory = self.preflight()?;
        let method: HttpMethod = method.parse()?;
        self.start(&factory, method, path, body, options)
    }

    pub fn get_request(
        &self,
        url: &str,
        params: &Params,
        options: RequestOptions,
    ) -> Result<PendingRequest, FetchError> {
        let url = query::build(url, params);
        self.issue(HttpMethod::Get, &url, Body::Null, options)
    }

    pub fn get(
        &self,
        url: &str,
        params: &Params,
        options: RequestOptions,
    ) -> Result<ResponseFuture, FetchError> {
        self.get_request(url, params, options).map(|req| req.result)
    }

    pub fn put_request(
        &self,
        url: &str,
        data: impl IntoBody,
        options: RequestOptions,
    ) -> Result<PendingRequest, FetchError> {
        self.issue(HttpMethod::Put, url, data, options)
    }

    pub fn put(
        &self,
        url: &str,
        data: impl IntoBody,
        options: RequestOptions,
    ) -> Result<ResponseFuture, FetchError> {
        self.put_request(url, data, options).map(|req| req.result)
    }

    pub fn post_request(
        &self,
        url: &str,
        data: impl IntoBody,
        options: RequestOptions,
    ) -> Result<PendingRequest, FetchError> {
        self.issue(HttpMethod::Post, url, data, options)
    }

    pub fn post(
        &self,
        url: &str,
        data: impl IntoBody,
        options: RequestOptions,
    ) -> Result<ResponseFuture, FetchError> {
        self.post_request(url, data, options).map(|req| req.result)
    }

    pub fn delete_request(
        &self,
        url: &str,
        params: &Params,
        options: RequestOptions,
    ) -> Result<PendingRequest, FetchError> {
        let url = query::build(url, params);
        self.issue(HttpMethod::Delete, &url, Body::Null, options)
    }

    pub fn delete(
        &self,
        url: &str,
        params: &Params,
        options: RequestOptions,
    ) -> Result<ResponseFuture, FetchError> {
        self.delete_request(url, params, options).map(|req| req.result)
    }

    /// Cancel every request currently in flight.
    ///
    /// Each handle reports `Abort`, which settles its result as
    /// `FetchError::Aborted` and removes it from the registry.
    pub fn abort(&self) {
        let handles = self.registry.snapshot();
        tracing::debug!(count = handles.len(), "aborting pending requests");
        for handle in handles {
            handle.abort();
        }
    }

    /// Ids of in-flight requests, in call order.
    pub fn pending(&self) -> Vec<RequestId> {
        self.registry.ids()
    }

    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.registry.contains(id)
    }

    fn preflight(&self) -> Result<TransportFactory, FetchError> {
        let factory = self
            .config
            .transport_factory
            .clone()
            .ok_or(FetchError::TransportUnavailable)?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(FetchError::AsyncPrimitiveUnavailable);
        }
        Ok(factory)
    }

    fn issue(
        &self,
        method: HttpMethod,
        path: &str,
        body: impl IntoBody,
        options: RequestOptions,
    ) -> Result<PendingRequest, FetchError> {
        let factory = self.preflight()?;
        self.start(&factory, method, path, body, options)
    }

    fn start(
        &self,
        factory: &TransportFactory,
        method: HttpMethod,
        path: &str,
        body: impl IntoBody,
        options: RequestOptions,
    ) -> Result<PendingRequest, FetchError> {
        let id = RequestId::new();
        let handle = factory();

        let (tx, rx) = oneshot::channel::<Result<Handle, FetchError>>();
        let sender = Arc::new(Mutex::new(Some(tx)));
        {
            let sender = Arc::clone(&sender);
            let registry = self.registry.clone();
            let weak = Arc::downgrade(&handle);
            handle.on_event(Arc::new(move |event: TransportEvent| {
                let settled = match event {
                    // A load without a status is not a response yet.
                    TransportEvent::Load => match weak.upgrade() {
                        Some(handle) if handle.status() != 0 => Ok(handle),
                        _ => return,
                    },
                    TransportEvent::Error => Err(FetchError::TransportFailed),
                    TransportEvent::Abort => Err(FetchError::Aborted),
                    TransportEvent::Timeout => Err(FetchError::ConnectionTimeout),
                };
                let Some(tx) = sender.lock().unwrap_or_else(PoisonError::into_inner).take() else {
                    return;
                };
                registry.close(id);
                tracing::trace!(%id, ?event, "request settled");
                let _ = tx.send(settled);
            }));
        }
        if let Some(listener) = options.on_progress.clone() {
            handle.on_progress(listener);
        }
        if let Some(listener) = options.on_upload_progress.clone() {
            handle.on_upload_progress(listener);
        }

        // Joined verbatim: "/api/" + "/users" is "/api//users".
        let url = format!("{}{}", self.config.base_path, path);
        handle.open(method, &url);

        // Headers and timeout must be set between open and send.
        let headers = merge::merged([&self.config.headers.resolve(), &options.headers]);
        for (name, value) in headers.sendable() {
            handle.set_request_header(&name, &value);
        }
        let timeout = if options.timeout.is_zero() {
            self.config.timeout
        } else {
            options.timeout
        };
        handle.set_timeout(timeout);

        let body = body.into_body().inspect_err(|e| {
            tracing::debug!(%id, error = %e, "request body rejected");
        })?;
        tracing::debug!(%id, %method, %url, "dispatching request");
        handle.send(body);

        self.registry.add(id, Arc::clone(&handle));
        // A fast transport can settle before the handle is registered.
        if sender.lock().unwrap_or_else(PoisonError::into_inner).is_none() {
            self.registry.close(id);
        }

        let pipeline = options.pipeline();
        let result = ResponseFuture::new(async move {
            let settled = rx.await.unwrap_or(Err(FetchError::TransportFailed));
            pipeline.run(settled)
        });

        Ok(PendingRequest { id, handle, result })
    }
}
