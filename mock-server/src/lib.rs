use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Path, RawQuery},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What `/echo` saw, returned as JSON.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/json", get(json))
        .route("/malformed", get(malformed))
        .route("/html", get(html))
        .route("/status/{code}", any(status))
        .route("/slow/{ms}", any(slow))
        .route("/echo", any(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn json() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "a": 1 }))
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{blah}")
}

async fn html() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], "<h1>Hi!</h1>")
}

async fn status(Path(code): Path<u16>) -> Result<impl IntoResponse, StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(serde_json::json!({ "status": code }))))
}

async fn slow(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "slept": ms }))
}

async fn echo(method: Method, RawQuery(query): RawQuery, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    tracing::debug!(%method, ?query, "echo");
    Json(Echo {
        method: method.to_string(),
        query,
        headers,
        body,
    })
}
