//! Request lifecycle against the in-memory transport.
//!
//! Each test issues requests through `FetchPlease`, then drives the fake
//! handles by hand to check settlement, registry bookkeeping and the
//! post-processing chain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fetch_please::fake::FakeServer;
use fetch_please::{
    Body, ClientConfig, FetchError, FetchPlease, Headers, Payload, RequestOptions, Scalar,
};
use serde_json::json;

const JSON: (&str, &str) = ("content-type", "application/json");

fn api(server: &FakeServer) -> FetchPlease {
    FetchPlease::new(ClientConfig::new("/api/").with_transport(server.factory()))
}

#[tokio::test]
async fn joins_paths_without_normalizing() {
    let server = FakeServer::new();
    let api = api(&server);

    let _a = api.request("GET", "/users", (), RequestOptions::new()).unwrap();
    assert_eq!(server.last().unwrap().url().as_deref(), Some("/api//users"));

    let _b = api.request("GET", "users", (), RequestOptions::new()).unwrap();
    assert_eq!(server.last().unwrap().url().as_deref(), Some("/api/users"));

    let bare = FetchPlease::new(ClientConfig::new("http://host").with_transport(server.factory()));
    let _c = bare.request("GET", "path", (), RequestOptions::new()).unwrap();
    assert_eq!(server.last().unwrap().url().as_deref(), Some("http://hostpath"));
}

#[tokio::test]
async fn sets_default_headers() {
    let server = FakeServer::new();
    let api = FetchPlease::new(
        ClientConfig::new("/api/")
            .with_headers(
                Headers::new()
                    .with("Content-Type", "application/json")
                    .with("X-Custom-Header", "custom"),
            )
            .with_transport(server.factory()),
    );

    let _req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    let fake = server.last().unwrap();
    assert_eq!(fake.request_header("Content-Type").as_deref(), Some("application/json"));
    assert_eq!(fake.request_header("X-Custom-Header").as_deref(), Some("custom"));
}

#[tokio::test]
async fn header_callback_runs_per_request() {
    let server = FakeServer::new();
    let counter = Arc::new(AtomicU64::new(0));
    let next = Arc::clone(&counter);
    let api = FetchPlease::new(
        ClientConfig::new("")
            .with_headers_fn(move || {
                Headers::new().with("X-Request-Number", next.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .with_transport(server.factory()),
    );

    let _a = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    let _b = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    let sent: Vec<_> = server
        .requests()
        .iter()
        .map(|fake| fake.request_header("X-Request-Number"))
        .collect();
    assert_eq!(sent, vec![Some("1".to_string()), Some("2".to_string())]);
}

#[tokio::test]
async fn filtered_headers_are_never_sent() {
    let server = FakeServer::new();
    let api = api(&server);
    let headers = Headers::new()
        .with("X-Undefined", Scalar::Undefined)
        .with("X-Null", Scalar::Null)
        .with("X-False", false)
        .with("X-Zero", 0)
        .with("X-Empty", "");

    let _req = api
        .request("GET", "/", (), RequestOptions::new().headers(headers))
        .unwrap();
    let fake = server.last().unwrap();
    assert_eq!(fake.request_header("X-Undefined"), None);
    assert_eq!(fake.request_header("X-Null"), None);
    assert_eq!(fake.request_header("X-False"), None);
    assert_eq!(fake.request_header("X-Zero").as_deref(), Some("0"));
    assert_eq!(fake.request_header("X-Empty").as_deref(), Some(""));
}

#[tokio::test]
async fn sets_timeout() {
    let server = FakeServer::new();
    let api = FetchPlease::new(
        ClientConfig::new("/api/")
            .with_timeout(Duration::from_millis(1))
            .with_transport(server.factory()),
    );
    assert_eq!(api.config().timeout, Duration::from_millis(1));

    let _req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    assert_eq!(server.last().unwrap().timeout(), Duration::from_millis(1));
}

#[tokio::test]
async fn tracks_opened_requests() {
    let server = FakeServer::new();
    let api = api(&server);
    assert_eq!(api.pending_count(), 0);

    let first = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    assert_eq!(api.pending_count(), 1);
    let second = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    assert_eq!(api.pending(), vec![first.id, second.id]);

    let fakes = server.requests();
    fakes[0].respond(200, &[JSON], "{}");
    assert!(!api.is_pending(first.id));
    assert!(api.is_pending(second.id));

    fakes[1].respond(200, &[JSON], "{}");
    assert_eq!(first.result.await, Ok(Payload::Json(json!({}))));
    assert_eq!(second.result.await, Ok(Payload::Json(json!({}))));
    assert_eq!(api.pending_count(), 0);
}

#[tokio::test]
async fn unacceptable_http_code_carries_status() {
    let server = FakeServer::new();
    let api = api(&server);

    let req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    assert_eq!(api.pending_count(), 1);
    server.last().unwrap().respond(404, &[JSON], "{}");

    assert_eq!(req.result.await, Err(FetchError::UnacceptableHttpCode(404)));
    assert_eq!(api.pending_count(), 0);
}

#[tokio::test]
async fn invalid_json_fails() {
    let server = FakeServer::new();
    let api = api(&server);

    let req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    server.last().unwrap().respond(200, &[JSON], "{blah}");

    assert!(matches!(req.result.await, Err(FetchError::JsonParseError(_))));
}

#[tokio::test]
async fn html_passes_through_raw() {
    let server = FakeServer::new();
    let api = api(&server);

    let req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    server
        .last()
        .unwrap()
        .respond(200, &[("Content-Type", "text/html")], "<h1>Hi!</h1>");

    let payload = req.result.await.unwrap();
    assert_eq!(payload.text().as_deref(), Some("<h1>Hi!</h1>"));
    assert_eq!(payload, Payload::Raw(req.handle));
}

#[tokio::test]
async fn abort_on_handle_settles_as_aborted() {
    let server = FakeServer::new();
    let api = api(&server);

    let req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    req.handle.abort();

    assert!(!api.is_pending(req.id));
    assert_eq!(req.result.await, Err(FetchError::Aborted));
}

#[tokio::test]
async fn transport_failure_and_timeout() {
    let server = FakeServer::new();
    let api = api(&server);

    let failed = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    server.last().unwrap().fail();
    let timed_out = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    server.last().unwrap().time_out();

    assert_eq!(failed.result.await, Err(FetchError::TransportFailed));
    assert_eq!(timed_out.result.await, Err(FetchError::ConnectionTimeout));
    assert_eq!(api.pending_count(), 0);
}

#[tokio::test]
async fn load_without_status_stays_pending() {
    let server = FakeServer::new();
    let api = api(&server);

    let req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    let fake = server.last().unwrap();
    fake.load_without_status();
    assert!(api.is_pending(req.id));

    let mut result = req.result;
    let early = tokio::time::timeout(Duration::from_millis(10), &mut result).await;
    assert!(early.is_err(), "result settled on a status-less load");

    fake.respond(200, &[JSON], r#"{"late":true}"#);
    assert_eq!(result.await, Ok(Payload::Json(json!({"late": true}))));
}

#[tokio::test]
async fn only_first_terminal_event_counts() {
    let server = FakeServer::new();
    let api = api(&server);

    let req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    let fake = server.last().unwrap();
    fake.time_out();
    fake.respond(200, &[JSON], "{}");
    req.handle.abort();

    assert_eq!(req.result.await, Err(FetchError::ConnectionTimeout));
}

#[tokio::test]
async fn unawaited_requests_still_deregister() {
    let server = FakeServer::new();
    let api = api(&server);

    let req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    server.last().unwrap().respond(500, &[], "");
    assert_eq!(api.pending_count(), 0);
    drop(req);
}

#[tokio::test]
async fn settling_during_send_leaves_nothing_pending() {
    let server = FakeServer::failing_on_send();
    let api = api(&server);

    let req = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    assert_eq!(api.pending_count(), 0);
    assert!(!api.is_pending(req.id));
    assert_eq!(req.result.await, Err(FetchError::TransportFailed));
}

#[tokio::test]
async fn custom_stages_replace_defaults() {
    let server = FakeServer::new();
    let api = api(&server);

    let options = RequestOptions::new()
        .handle_response(Ok)
        .handle_json(|handle| Ok(Payload::Json(json!({ "status": handle.status() }))));
    let req = api.request("GET", "/", (), options).unwrap();
    server.last().unwrap().respond(418, &[], "teapot");
    assert_eq!(req.result.await, Ok(Payload::Json(json!({"status": 418}))));
}

#[tokio::test]
async fn error_handler_sees_every_failure() {
    let server = FakeServer::new();
    let api = api(&server);

    let options = RequestOptions::new().handle_error(|error| {
        Ok(Payload::Json(json!({ "recovered": error.to_string() })))
    });
    let req = api.request("GET", "/", (), options).unwrap();
    req.handle.abort();

    assert_eq!(
        req.result.await,
        Ok(Payload::Json(json!({"recovered": "Resource has been aborted"})))
    );
}

#[tokio::test]
async fn progress_listeners_are_attached() {
    let server = FakeServer::new();
    let api = api(&server);
    let downloaded = Arc::new(AtomicU64::new(0));
    let uploaded = Arc::new(AtomicU64::new(0));

    let (down, up) = (Arc::clone(&downloaded), Arc::clone(&uploaded));
    let options = RequestOptions::new()
        .on_progress(move |p| down.store(p.loaded, Ordering::SeqCst))
        .on_upload_progress(move |p| up.store(p.loaded, Ordering::SeqCst));
    let req = api.request("POST", "/", "abc", options).unwrap();

    let fake = server.last().unwrap();
    fake.upload(3, Some(3));
    fake.respond(200, &[JSON], "[1,2,3]");
    req.result.await.unwrap();

    assert_eq!(uploaded.load(Ordering::SeqCst), 3);
    assert_eq!(downloaded.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn body_is_serialized_before_send() {
    let server = FakeServer::new();
    let api = api(&server);

    let _a = api.request("PUT", "/", json!({"a": [1, 2]}), RequestOptions::new()).unwrap();
    assert_eq!(
        server.last().unwrap().body(),
        Some(Body::Text(r#"{"a":[1,2]}"#.to_string()))
    );

    let _b = api.request("POST", "/", "already text", RequestOptions::new()).unwrap();
    assert_eq!(
        server.last().unwrap().body(),
        Some(Body::Text("already text".to_string()))
    );

    let _c = api.request("DELETE", "/", (), RequestOptions::new()).unwrap();
    assert_eq!(server.last().unwrap().body(), Some(Body::Null));

    let _d = api.request("PUT", "/", json!(null), RequestOptions::new()).unwrap();
    assert_eq!(server.last().unwrap().body(), Some(Body::Null));

    let _e = api.request("PUT", "/", json!("abc"), RequestOptions::new()).unwrap();
    assert_eq!(server.last().unwrap().body(), Some(Body::Text("abc".to_string())));
}

#[tokio::test]
async fn config_mutation_applies_to_later_requests() {
    let server = FakeServer::new();
    let mut api = api(&server);
    api.config_mut().base_path = "/v2/".to_string();

    let _req = api.request("GET", "users", (), RequestOptions::new()).unwrap();
    assert_eq!(server.last().unwrap().url().as_deref(), Some("/v2/users"));

    api.config_mut().transport_factory = None;
    assert_eq!(
        api.request("GET", "users", (), RequestOptions::new()).unwrap_err(),
        FetchError::TransportUnavailable
    );
}
