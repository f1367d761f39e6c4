use std::future::{Future, IntoFuture};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;

use bytes::Bytes;
use headers::HeaderMapExt;
use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, error};
use url::Url;

use super::ApiCall;
use crate::client::dispatch::DispatchMessage;
use crate::client::{
    ApiClientError, CallBody, Discriminated, HttpTransport, Outcome, Passthrough, RawMap,
    RawOutcome, RawResponse, ResponseShape, TransportRequest, Typed,
};

impl<T> ApiCall<T>
where
    T: HttpTransport,
{
    /// Executes the call and waits for its outcome in the given shape.
    ///
    /// The call runs on its own task: dropping the returned future does not cancel it, the
    /// outcome is then discarded once settled.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use courier_core::{ApiClient, Outcome, Discriminated};
    /// # use serde::Deserialize;
    /// # #[derive(Deserialize)]
    /// # struct User { id: u32, name: String }
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = ApiClient::builder().with_base_url("https://api.example.com").build()?;
    ///
    /// match client.get("/users/123").exchange(Discriminated::<User>::new()).await {
    ///     Outcome::Success(user) => println!("found {}", user.name),
    ///     Outcome::Failure(error) => eprintln!("lookup failed: {error}"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn exchange<S>(self, shape: S) -> S::Output
    where
        S: ResponseShape,
    {
        let (sender, receiver) = oneshot::channel();
        let fallback = shape.clone();

        self.launch(move |response| {
            let output = settle_guarded(shape, response);
            if sender.send(output).is_err() {
                debug!("caller is gone, outcome discarded");
            }
        });

        match receiver.await {
            Ok(output) => output,
            Err(_) => fallback.settle(Err(ApiClientError::custom(
                "completion dispatcher stopped before settling the call",
            ))),
        }
    }

    /// Executes the call and hands its outcome to `callback`, on the client's dispatcher.
    ///
    /// The callback is invoked exactly once. It must not block: it delays every other
    /// delivery of the client.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use courier_core::{ApiClient, Typed};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = ApiClient::builder().build()?;
    ///
    /// client.get("/counter").on_complete(Typed::<u64>::new(), |result| match result {
    ///     Ok(count) => println!("count: {count}"),
    ///     Err(error) => eprintln!("{error}"),
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn on_complete<S, F>(self, shape: S, callback: F)
    where
        S: ResponseShape,
        F: FnOnce(S::Output) + Send + 'static,
    {
        self.launch(move |response| callback(settle_guarded(shape, response)));
    }

    /// Decodes the `result` envelope of the response into `R`.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiClientError`] of the first failing stage.
    pub async fn as_json<R>(self) -> Result<R, ApiClientError>
    where
        R: DeserializeOwned + Send + 'static,
    {
        self.exchange(Typed::<R>::new()).await
    }

    /// Like [`as_json`](Self::as_json), delivered as an [`Outcome`].
    pub async fn as_outcome<R>(self) -> Outcome<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        self.exchange(Discriminated::<R>::new()).await
    }

    /// Returns the top-level JSON object of the response, with the response headers.
    pub async fn as_raw_map(self) -> RawOutcome {
        self.exchange(RawMap).await
    }

    /// Returns the validated body, undecoded.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiClientError`] of the transport or the validation.
    pub async fn as_bytes(self) -> Result<Bytes, ApiClientError> {
        self.exchange(Passthrough).await
    }

    /// Prepares the request, runs the transport on a dedicated task, and sends `deliver`
    /// to the dispatcher once the transport settled.
    fn launch<F>(self, deliver: F)
    where
        F: FnOnce(Result<RawResponse, ApiClientError>) + Send + 'static,
    {
        let prepared = self.prepare();
        let Self {
            transport,
            dispatcher,
            ..
        } = self;

        let task_dispatcher = dispatcher.clone();
        match prepared {
            Err(error) => {
                debug!(%error, "call preparation failed");
                dispatcher.spawn(async move {
                    let job = Box::new(move || deliver(Err(error)));
                    task_dispatcher
                        .send(DispatchMessage::CallSettled {
                            job,
                            in_flight: false,
                        })
                        .await;
                });
            }
            Ok(request) => {
                dispatcher.spawn(async move {
                    task_dispatcher.send(DispatchMessage::CallStarted).await;

                    // Own task, so a panicking transport still settles the call.
                    let execution = task_dispatcher
                        .spawn(async move { transport.execute(request).await });
                    let response = match execution.await {
                        Ok(result) => result.map_err(|error| ApiClientError::NotHttpResponse {
                            message: error.to_string(),
                        }),
                        Err(error) => {
                            error!(%error, "transport task failed");
                            Err(ApiClientError::NotHttpResponse {
                                message: format!("transport task failed: {error}"),
                            })
                        }
                    };

                    let job = Box::new(move || deliver(response));
                    task_dispatcher
                        .send(DispatchMessage::CallSettled {
                            job,
                            in_flight: true,
                        })
                        .await;
                });
            }
        }
    }

    fn prepare(&self) -> Result<TransportRequest, ApiClientError> {
        let url = Self::build_url(&self.base_url, self.request.endpoint())?;
        let body = CallBody::encode(&self.request)?;
        let headers =
            Self::build_headers(body.as_ref(), &self.default_headers, self.request.headers())?;

        Ok(TransportRequest {
            method: self.request.method().clone(),
            url,
            headers,
            body: body.map(|body| body.data),
            timeout: self.timeout,
            bypass_cache: true,
        })
    }
}

/// Settles `shape`, turning a panic while decoding into a delivered [`ApiClientError::Custom`].
fn settle_guarded<S>(shape: S, response: Result<RawResponse, ApiClientError>) -> S::Output
where
    S: ResponseShape,
{
    let fallback = shape.clone();
    match catch_unwind(AssertUnwindSafe(move || shape.settle(response))) {
        Ok(output) => output,
        Err(_) => {
            error!("response handling panicked");
            fallback.settle(Err(ApiClientError::custom(
                "response handling panicked while settling the call",
            )))
        }
    }
}

impl<T> ApiCall<T> {
    pub(super) fn build_url(base_url: &str, endpoint: &str) -> Result<Url, ApiClientError> {
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        url.parse::<Url>()
            .map_err(|error| ApiClientError::InvalidUrl { url, error })
    }

    /// Body content type first, then default headers, then call headers; last write wins.
    pub(super) fn build_headers(
        body: Option<&CallBody>,
        default_headers: &IndexMap<String, String>,
        headers: &IndexMap<String, String>,
    ) -> Result<HeaderMap, ApiClientError> {
        let mut result = HeaderMap::new();

        if let Some(body) = body {
            result.typed_insert(body.content_type.clone());
        }

        for (name, value) in default_headers.iter().chain(headers) {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|error| {
                ApiClientError::InvalidHeader {
                    name: name.clone(),
                    message: error.to_string(),
                }
            })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|error| ApiClientError::InvalidHeader {
                    name: name.clone(),
                    message: error.to_string(),
                })?;
            result.insert(header_name, header_value);
        }

        Ok(result)
    }
}

/// Implement IntoFuture for ApiCall to enable direct .await syntax
///
/// Awaiting a call delivers its [`RawOutcome`]:
/// ```rust,no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let client = courier_core::ApiClient::builder().build()?;
/// let outcome = client.get("/users").await;
/// let users = outcome.result?;
/// # Ok(())
/// # }
/// ```
impl<T> IntoFuture for ApiCall<T>
where
    T: HttpTransport,
{
    type Output = RawOutcome;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.as_raw_map())
    }
}
