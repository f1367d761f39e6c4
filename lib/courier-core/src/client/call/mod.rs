use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use super::dispatch::DispatchSender;
use super::{CallRequest, ReqwestTransport};

mod builder;
mod execution;

/// A single outbound call, ready to be refined and executed.
///
/// An `ApiCall` is created by [`ApiClient`](super::ApiClient) from a [`CallRequest`] and
/// carries everything needed to run it: transport, base URL, timeout, default headers and
/// the client's completion dispatcher.
///
/// # Method Groups
///
/// ## Request Methods
/// - [`with_parameters(map)`](Self::with_parameters) - Replace the parameters
/// - [`with_parameter(name, value)`](Self::with_parameter) - Add a single parameter
/// - [`with_parameters_from(value)`](Self::with_parameters_from) - Parameters from a serializable value
/// - [`with_header(name, value)`](Self::with_header) - Add a single header
/// - [`with_headers(headers)`](Self::with_headers) - Add several headers
/// - [`with_kind(kind)`](Self::with_kind) / [`multipart()`](Self::multipart) - Choose the body encoding
///
/// ## Execution
/// - [`exchange(shape)`](Self::exchange) - Await the outcome in the given [`ResponseShape`](super::ResponseShape)
/// - [`as_json()`](Self::as_json), [`as_outcome()`](Self::as_outcome), [`as_raw_map()`](Self::as_raw_map),
///   [`as_bytes()`](Self::as_bytes) - Shortcuts for the built-in shapes
/// - [`on_complete(shape, callback)`](Self::on_complete) - Deliver the outcome to a callback
/// - `.await` - Same as [`as_raw_map()`](Self::as_raw_map)
///
/// Whatever the delivery form, the call settles exactly once: validation, decoding and
/// delivery run on the client's dispatcher, in settle order.
#[derive(derive_more::Debug)]
pub struct ApiCall<T = ReqwestTransport> {
    #[debug(skip)]
    pub(super) transport: Arc<T>,
    pub(super) base_url: Arc<str>,
    pub(super) timeout: Duration,
    pub(super) default_headers: Arc<IndexMap<String, String>>,
    #[debug(skip)]
    pub(super) dispatcher: DispatchSender,

    pub(super) request: CallRequest,
}

impl<T> ApiCall<T> {
    /// The request as configured so far.
    pub fn request(&self) -> &CallRequest {
        &self.request
    }
}
