//! Bulk cancellation through `FetchPlease::abort`.

use fetch_please::fake::{Call, FakeServer};
use fetch_please::{ClientConfig, FetchError, FetchPlease, Params, Payload, RequestOptions};
use serde_json::json;

fn api(server: &FakeServer) -> FetchPlease {
    FetchPlease::new(ClientConfig::new("/api/").with_transport(server.factory()))
}

#[tokio::test]
async fn aborts_all_opened_requests() {
    let server = FakeServer::new();
    let api = api(&server);

    let first = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    let second = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    assert_eq!(api.pending_count(), 2);

    api.abort();

    assert_eq!(api.pending_count(), 0);
    assert_eq!(first.result.await, Err(FetchError::Aborted));
    assert_eq!(second.result.await, Err(FetchError::Aborted));
}

#[tokio::test]
async fn abort_skips_settled_requests() {
    let server = FakeServer::new();
    let api = api(&server);

    let done = api.get_request("done", &Params::new(), RequestOptions::new()).unwrap();
    let open = api.get_request("open", &Params::new(), RequestOptions::new()).unwrap();
    server.requests()[0].respond(200, &[("Content-Type", "application/json")], "{}");

    api.abort();

    assert!(!server.requests()[0].calls().contains(&Call::Abort));
    assert!(server.requests()[1].calls().contains(&Call::Abort));
    assert_eq!(done.result.await, Ok(Payload::Json(json!({}))));
    assert_eq!(open.result.await, Err(FetchError::Aborted));
}

#[tokio::test]
async fn abort_with_nothing_pending_is_a_no_op() {
    let server = FakeServer::new();
    let api = api(&server);
    api.abort();
    assert_eq!(api.pending_count(), 0);
    assert_eq!(server.count(), 0);
}

#[tokio::test]
async fn requests_after_abort_are_tracked_again() {
    let server = FakeServer::new();
    let api = api(&server);

    let _old = api.request("GET", "/", (), RequestOptions::new()).unwrap();
    api.abort();
    let fresh = api.request("GET", "/", (), RequestOptions::new()).unwrap();

    assert_eq!(api.pending(), vec![fresh.id]);
}

#[tokio::test]
async fn abort_routes_through_error_handler() {
    let server = FakeServer::new();
    let api = api(&server);

    let options = RequestOptions::new().handle_error(|error| match error {
        FetchError::Aborted => Ok(Payload::Json(json!("cancelled"))),
        other => Err(other),
    });
    let req = api.request("GET", "/", (), options).unwrap();
    api.abort();
    assert_eq!(req.result.await, Ok(Payload::Json(json!("cancelled"))));
}
