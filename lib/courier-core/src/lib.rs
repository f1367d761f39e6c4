//! # Courier Core
//!
//! Single-shot HTTP calls, decoded into typed results with a small error taxonomy.
//!
//! A call goes through a fixed pipeline:
//!
//! 1. **Request descriptor** - a [`CallRequest`]: endpoint, method, parameters, headers, kind
//! 2. **Body encoding** - a [`CallBody`], JSON or `multipart/form-data`; `GET` never has one
//! 3. **Transport** - an [`HttpTransport`], [`ReqwestTransport`] by default
//! 4. **Validation** - the response must be `200 OK` with a body
//! 5. **Decoding** - the `result` envelope into a typed value, or the raw JSON object
//! 6. **Delivery** - exactly one outcome per call, on the client's completion dispatcher
//!
//! The first failing stage stops the pipeline and its [`ApiClientError`] is delivered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_core::ApiClient;
//! # use serde::Deserialize;
//! # #[derive(Deserialize)]
//! # struct User { id: u32, name: String }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::builder()
//!     .with_base_url("https://api.example.com")
//!     .build()?;
//!
//! // The server answers `{"result": {"id": 123, "name": "Alice"}}`
//! let user: User = client.get("/users/123").as_json().await?;
//!
//! // Parameters of non-GET calls are sent as a JSON body
//! let created: User = client
//!     .post("/users")
//!     .with_parameter("name", "Bob")
//!     .as_json()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Output Shapes
//!
//! The same call can be delivered in several shapes, see [`ResponseShape`]:
//!
//! ```rust,no_run
//! use courier_core::{ApiClient, Outcome, Passthrough, RawMap, Typed};
//!
//! # async fn example(client: ApiClient) -> Result<(), Box<dyn std::error::Error>> {
//! // Typed value from the `result` envelope
//! let count: u64 = client.get("/count").exchange(Typed::<u64>::new()).await?;
//!
//! // Success or failure, as a value
//! match client.get("/count").as_outcome::<u64>().await {
//!     Outcome::Success(count) => println!("{count}"),
//!     Outcome::Failure(error) => eprintln!("{error}"),
//! }
//!
//! // Top-level JSON object and response headers
//! let raw = client.get("/count").exchange(RawMap).await;
//! println!("{:?}", raw.header("content-type"));
//! let object = raw.into_result()?;
//!
//! // Validated body, for caller-side interpretation
//! let bytes = client.get("/count").exchange(Passthrough).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Activity
//!
//! Each client counts its calls in flight, see [`ActivityIndicator`].
//!
//! ## Error Handling
//!
//! - [`ApiClientError`] - every failure a call can settle with
//! - [`TransportError`] - what an [`HttpTransport`] reports when no response was received

mod client;

pub use self::client::{
    ActivityIndicator, ActivitySnapshot, ApiCall, ApiClient, ApiClientBuilder, ApiClientError,
    CallBody, CallRequest, DEFAULT_TIMEOUT, Discriminated, ENVELOPE_KEY, HttpTransport, Outcome,
    Passthrough, RawMap, RawOutcome, RawResponse, ReqwestTransport, RequestKind, ResponseShape,
    TransportError, TransportRequest, Typed, decode_envelope, decode_object,
};
