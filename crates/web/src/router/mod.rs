//! The middleware chain and route registration.
//!
//! A [`Router`] is an ordered list of [`Middleware`] entries. Routes are entries too: each
//! registration appends a [`Route`] that answers requests matching its method and pattern and
//! passes everything else on. Routes are tried in registration order and the first match wins, so
//! a broad pattern registered early shadows a narrower one registered later.
//!
//! ```
//! use std::convert::Infallible;
//! use switchyard_web::Router;
//! use switchyard_web::handler::no_input_sync;
//!
//! let router = Router::new();
//! router.get("/ping", no_input_sync(|| Ok::<_, Infallible>("pong")));
//! assert_eq!(router.len(), 2);
//! ```
//!
//! Each dispatch works on a snapshot of the chain taken when it starts. Registering entries while
//! requests are in flight is safe and only affects requests dispatched afterwards.

mod pattern;
mod route;

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Method;

use crate::error::{DefaultErrorMapper, ErrorMapper};
use crate::handler::RouteHandler;
use crate::middleware::{Fallback, Middleware, Next, QueryString};
use crate::request::RequestContext;
use crate::response::ResponseSink;

pub use pattern::{PatternError, RoutePattern, match_path};
pub use route::Route;

type Chain = Vec<Arc<dyn Middleware>>;

macro_rules! method_route {
    ($name:ident, $method:ident) => {
        #[doc = concat!("Registers a route for `", stringify!($method), "` requests, see [`route`](Self::route).")]
        pub fn $name(&self, pattern: &str, handler: RouteHandler) -> &Self {
            self.route(Method::$method, pattern, handler)
        }
    };
}

/// Ordered middleware chain with route registration
pub struct Router {
    chain: ArcSwap<Chain>,
    error_mapper: Arc<dyn ErrorMapper>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("entries", &self.len()).finish_non_exhaustive()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a router whose first entry is the [`QueryString`] middleware, using the
    /// [`DefaultErrorMapper`].
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates an empty router, without query parsing.
    pub fn bare() -> Self {
        Self::builder().query_string(false).build()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Appends a middleware entry to the end of the chain.
    pub fn add<M: Middleware + 'static>(&self, middleware: M) -> &Self {
        self.add_arc(Arc::new(middleware))
    }

    pub fn add_arc(&self, middleware: Arc<dyn Middleware>) -> &Self {
        self.chain.rcu(|chain| {
            let mut next = Chain::clone(chain);
            next.push(Arc::clone(&middleware));
            next
        });
        self
    }

    /// Registers `handler` for `method` requests whose path matches `pattern`.
    pub fn try_route(&self, method: Method, pattern: &str, handler: RouteHandler) -> Result<&Self, PatternError> {
        let pattern = RoutePattern::parse(pattern)?;
        Ok(self.add(Route::new(method, pattern, handler, Arc::clone(&self.error_mapper))))
    }

    /// Same as [`try_route`](Self::try_route) for patterns known to be valid.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` has more than one parameter or an unnamed parameter.
    pub fn route(&self, method: Method, pattern: &str, handler: RouteHandler) -> &Self {
        match self.try_route(method, pattern, handler) {
            Ok(router) => router,
            Err(e) => panic!("invalid route: {e}"),
        }
    }

    method_route!(get, GET);
    method_route!(post, POST);
    method_route!(put, PUT);
    method_route!(patch, PATCH);
    method_route!(delete, DELETE);
    method_route!(head, HEAD);
    method_route!(options, OPTIONS);

    /// Number of entries in the chain, routes included
    pub fn len(&self) -> usize {
        self.chain.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.load().is_empty()
    }

    pub fn error_mapper(&self) -> &Arc<dyn ErrorMapper> {
        &self.error_mapper
    }

    /// Runs the chain for one request, ending in `fallback` if every entry continues.
    pub async fn dispatch(&self, req: &mut RequestContext, res: &mut ResponseSink, fallback: &dyn Fallback) {
        let chain = self.chain.load_full();
        Next::new(&chain, fallback).run(req, res).await;
    }
}

pub struct RouterBuilder {
    query_string: bool,
    error_mapper: Arc<dyn ErrorMapper>,
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("query_string", &self.query_string).finish_non_exhaustive()
    }
}

impl RouterBuilder {
    fn new() -> Self {
        Self { query_string: true, error_mapper: Arc::new(DefaultErrorMapper) }
    }

    /// Whether the router starts with the [`QueryString`] middleware, on by default
    pub fn query_string(mut self, enabled: bool) -> Self {
        self.query_string = enabled;
        self
    }

    /// The mapper every route of this router classifies failures with
    pub fn error_mapper<M: ErrorMapper + 'static>(mut self, error_mapper: M) -> Self {
        self.error_mapper = Arc::new(error_mapper);
        self
    }

    pub fn build(self) -> Router {
        let mut chain: Chain = Vec::new();
        if self.query_string {
            chain.push(Arc::new(QueryString));
        }
        Router { chain: ArcSwap::from_pointee(chain), error_mapper: self.error_mapper }
    }
}
