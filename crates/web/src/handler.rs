//! Route handlers and the adapters that build them.
//!
//! A [`RouteHandler`] is one of three shapes:
//!
//! - [`RouteHandler::NoInput`]: ignores the request
//! - [`RouteHandler::TypedInput`]: receives an input decoded from the request (see
//!   [`decode_input`](crate::extract::decode_input))
//! - [`RouteHandler::RawRequest`]: receives a snapshot of the whole [`RequestContext`]
//!
//! Each shape is built by an explicit adapter for async closures (`no_input`, `typed`, `raw`) and
//! one for synchronous closures (`no_input_sync`, `typed_sync`, `raw_sync`). [`typed_with_request`]
//! hands the handler both the decoded input and the request.
//!
//! Handlers return `Result<O, E>` where `O: Serialize` is written as JSON with `200 OK` and `E`
//! converts into [`HandlerError`].

use std::fmt;
use std::future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::HandlerError;
use crate::extract::decode_input;
use crate::request::RequestContext;
use crate::response::ResponseSink;

pub type HandlerResult = Result<Output, HandlerError>;

type NoInputFn = dyn Fn() -> BoxFuture<'static, HandlerResult> + Send + Sync;
type TypedInputFn = dyn Fn(&RequestContext) -> BoxFuture<'static, HandlerResult> + Send + Sync;
type RawRequestFn = dyn Fn(RequestContext) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A type-erased route handler.
#[derive(Clone)]
pub enum RouteHandler {
    NoInput(Arc<NoInputFn>),
    TypedInput(Arc<TypedInputFn>),
    RawRequest(Arc<RawRequestFn>),
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RouteHandler").field(&self.kind()).finish()
    }
}

impl RouteHandler {
    /// Runs the handler for `req`.
    ///
    /// For typed handlers a decode failure is returned as [`HandlerError::Decode`] and the
    /// handler is not called.
    pub async fn invoke(&self, req: &RequestContext) -> HandlerResult {
        match self {
            RouteHandler::NoInput(f) => f().await,
            RouteHandler::TypedInput(f) => f(req).await,
            RouteHandler::RawRequest(f) => f(req.clone()).await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RouteHandler::NoInput(_) => "no_input",
            RouteHandler::TypedInput(_) => "typed_input",
            RouteHandler::RawRequest(_) => "raw_request",
        }
    }
}

/// The successful result of a handler, ready to be written.
pub struct Output {
    body: Box<dyn EncodeBody>,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

impl Output {
    pub fn json<T: Serialize + Send + 'static>(value: T) -> Self {
        Self { body: Box::new(Json(value)) }
    }

    /// Writes the value as JSON with `200 OK`
    pub fn write_to(self, res: &mut ResponseSink) {
        self.body.write_to(res);
    }
}

trait EncodeBody: Send {
    fn write_to(self: Box<Self>, res: &mut ResponseSink);
}

struct Json<T>(T);

impl<T: Serialize + Send> EncodeBody for Json<T> {
    fn write_to(self: Box<Self>, res: &mut ResponseSink) {
        res.write_json(&self.0, StatusCode::OK);
    }
}

fn into_handler_result<O, E>(result: Result<O, E>) -> HandlerResult
where
    O: Serialize + Send + 'static,
    E: Into<HandlerError>,
{
    result.map(Output::json).map_err(Into::into)
}

/// Adapts an async handler that takes no input.
pub fn no_input<F, Fut, O, E>(f: F) -> RouteHandler
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Serialize + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    RouteHandler::NoInput(Arc::new(move || f().map(into_handler_result).boxed()))
}

/// Adapts a synchronous handler that takes no input.
///
/// ```
/// use std::convert::Infallible;
/// use switchyard_web::handler::no_input_sync;
///
/// let ping = no_input_sync(|| Ok::<_, Infallible>("pong"));
/// assert_eq!(ping.kind(), "no_input");
/// ```
pub fn no_input_sync<F, O, E>(f: F) -> RouteHandler
where
    F: Fn() -> Result<O, E> + Send + Sync + 'static,
    O: Serialize + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    RouteHandler::NoInput(Arc::new(move || future::ready(into_handler_result(f())).boxed()))
}

/// Adapts an async handler whose input is decoded from the request.
pub fn typed<I, F, Fut, O, E>(f: F) -> RouteHandler
where
    I: DeserializeOwned + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Serialize + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    RouteHandler::TypedInput(Arc::new(move |req: &RequestContext| match decode_input::<I>(req) {
        Ok(input) => f(input).map(into_handler_result).boxed(),
        Err(e) => future::ready(Err(HandlerError::Decode(e))).boxed(),
    }))
}

/// Adapts a synchronous handler whose input is decoded from the request.
pub fn typed_sync<I, F, O, E>(f: F) -> RouteHandler
where
    I: DeserializeOwned + Send + 'static,
    F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    O: Serialize + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    RouteHandler::TypedInput(Arc::new(move |req: &RequestContext| {
        let result = match decode_input::<I>(req) {
            Ok(input) => into_handler_result(f(input)),
            Err(e) => Err(HandlerError::Decode(e)),
        };
        future::ready(result).boxed()
    }))
}

/// Adapts an async handler that receives the decoded input together with the request.
pub fn typed_with_request<I, F, Fut, O, E>(f: F) -> RouteHandler
where
    I: DeserializeOwned + Send + 'static,
    F: Fn(I, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Serialize + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    RouteHandler::TypedInput(Arc::new(move |req: &RequestContext| match decode_input::<I>(req) {
        Ok(input) => f(input, req.clone()).map(into_handler_result).boxed(),
        Err(e) => future::ready(Err(HandlerError::Decode(e))).boxed(),
    }))
}

/// Adapts an async handler that works on the request directly.
pub fn raw<F, Fut, O, E>(f: F) -> RouteHandler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Serialize + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    RouteHandler::RawRequest(Arc::new(move |req: RequestContext| f(req).map(into_handler_result).boxed()))
}

/// Adapts a synchronous handler that works on the request directly.
pub fn raw_sync<F, O, E>(f: F) -> RouteHandler
where
    F: Fn(RequestContext) -> Result<O, E> + Send + Sync + 'static,
    O: Serialize + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    RouteHandler::RawRequest(Arc::new(move |req: RequestContext| future::ready(into_handler_result(f(req))).boxed()))
}
