use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::ops::Deref;
use std::time::Duration;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Multipart, Path};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use courier_core::{ApiClient, ApiClientBuilder};

/// How long `/api/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

/// A server answering with the `result` envelope, plus every way a call can go wrong.
pub fn router() -> Router {
    Router::new()
        .route("/api/users/{id}", get(get_user))
        .route(
            "/api/echo",
            get(echo).post(echo).put(echo).patch(echo).delete(echo),
        )
        .route("/api/upload", axum::routing::post(upload))
        .route("/api/headers", get(echo_headers))
        .route("/api/missing", get(missing))
        .route("/api/not-json", get(|| async { "not json" }))
        .route(
            "/api/unboxed",
            get(|| async { Json(json!({ "notresult": 1 })) }),
        )
        .route("/api/empty", get(|| async { StatusCode::OK }))
        .route("/api/slow", get(slow))
}

async fn get_user(Path(id): Path<u32>) -> Json<Value> {
    Json(json!({
        "result": { "id": id, "name": format!("user-{id}"), "role": "admin" }
    }))
}

async fn echo(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let parameters = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);

    Json(json!({
        "result": { "content_type": content_type, "parameters": parameters }
    }))
}

async fn upload(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    let mut fields = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let text = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        fields.insert(name, Value::String(text));
    }
    Ok(Json(json!({ "result": fields })))
}

async fn echo_headers(headers: HeaderMap) -> impl IntoResponse {
    let received = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect::<BTreeMap<_, _>>();

    (
        [("x-served-by", "courier-tests")],
        Json(json!({ "result": received })),
    )
}

async fn missing() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not found" })),
    )
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({ "result": true }))
}

/// The test server, running on a random local port, with a client targeting it.
#[derive(Debug)]
pub struct TestApp {
    client: ApiClient,
    address: SocketAddr,
    server: JoinHandle<()>,
}

impl TestApp {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind test listener")?;
        let address = listener.local_addr()?;
        info!(%address, "launching server");

        let server = tokio::spawn(async move {
            axum::serve(listener, router())
                .await
                .expect("server launched");
        });

        let client = Self::builder_for(address).build()?;
        Ok(Self {
            client,
            address,
            server,
        })
    }

    /// A builder targeting the server, for clients with custom settings.
    pub fn builder(&self) -> ApiClientBuilder {
        Self::builder_for(self.address)
    }

    fn builder_for(address: SocketAddr) -> ApiClientBuilder {
        ApiClient::builder().with_base_url(format!("http://{address}/api"))
    }
}

impl Deref for TestApp {
    type Target = ApiClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}
