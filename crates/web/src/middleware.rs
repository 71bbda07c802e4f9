//! Middleware entries and the continuation that links them.
//!
//! Every entry of a [`Router`](crate::Router) chain implements [`Middleware`]. An entry receives
//! the request, the response sink and a [`Next`]. It either calls [`Next::run`] to hand the
//! request to the rest of the chain, or returns without calling it, which ends the chain for this
//! request (usually after writing a response).
//!
//! `Next` is consumed by `run`, so an entry can continue the chain at most once.
//!
//! When every entry continues, the chain ends in a [`Fallback`], supplied by the
//! [`Dispatcher`](crate::Dispatcher) rather than by the router.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use tracing::{trace, warn};

use crate::request::RequestContext;
use crate::response::ResponseSink;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: &mut RequestContext, res: &mut ResponseSink, next: Next<'_>);
}

/// The rest of the chain after the current entry.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    fallback: &'a dyn Fallback,
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("remaining", &self.chain.len()).finish_non_exhaustive()
    }
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], fallback: &'a dyn Fallback) -> Self {
        Self { chain, fallback }
    }

    /// Number of entries still ahead, not counting the fallback
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Runs the next entry, or the fallback if none is left.
    pub async fn run(self, req: &mut RequestContext, res: &mut ResponseSink) {
        match self.chain.split_first() {
            Some((current, rest)) => {
                trace!(remaining = rest.len(), "proceed to next middleware");
                current.handle(req, res, Next::new(rest, self.fallback)).await;
            }
            None => {
                trace!("chain exhausted, run fallback");
                self.fallback.handle(req, res).await;
            }
        }
    }
}

/// What a synchronous middleware built with [`from_fn`] wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the rest of the chain
    Proceed,
    /// End the chain here
    Stop,
}

/// A [`Middleware`] backed by a synchronous closure, built with [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}

/// Adapts a closure into a middleware entry.
///
/// ```
/// use switchyard_web::middleware::{Flow, from_fn};
///
/// let require_token = from_fn(|req, res| {
///     if req.header("x-token").is_some() {
///         return Flow::Proceed;
///     }
///     let _ = res.set_status(http::StatusCode::UNAUTHORIZED);
///     res.write_text("missing token");
///     Flow::Stop
/// });
/// # let _ = require_token;
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> Flow + Send + Sync,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> Flow + Send + Sync,
{
    async fn handle(&self, req: &mut RequestContext, res: &mut ResponseSink, next: Next<'_>) {
        match (self.f)(req, res) {
            Flow::Proceed => next.run(req, res).await,
            Flow::Stop => {}
        }
    }
}

/// The terminal step of a chain, run when every entry continued.
#[async_trait]
pub trait Fallback: Send + Sync {
    async fn handle(&self, req: &RequestContext, res: &mut ResponseSink);
}

#[async_trait]
impl<F> Fallback for F
where
    F: Fn(&RequestContext, &mut ResponseSink) + Send + Sync,
{
    async fn handle(&self, req: &RequestContext, res: &mut ResponseSink) {
        (self)(req, res);
    }
}

/// The default [`Fallback`]: `404 Resource Not Found`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

#[async_trait]
impl Fallback for NotFound {
    async fn handle(&self, req: &RequestContext, res: &mut ResponseSink) {
        trace!(method = %req.method(), path = req.path(), "no route matched");
        if res.set_status(StatusCode::NOT_FOUND).is_ok() {
            res.write_text("Resource Not Found");
        }
    }
}

/// Parses the URI query into [`RequestContext::query_params`].
///
/// Keys and values are form-urlencoded decoded. A key that appears more than once keeps a single
/// entry whose values are joined with `,` in order of appearance, so `?a=1&b=2&a=3` yields
/// `a = "1,3"` and `b = "2"`. Empty values are left out of the join: `?a&a=1` yields `a = "1"`,
/// while a lone `?flag` yields `flag = ""`.
///
/// An unparseable query is logged and skipped; the chain always continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryString;

impl QueryString {
    fn parse_into(query: &str, req: &mut RequestContext) {
        let pairs = match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!(cause = %e, query, "can't parse query string");
                return;
            }
        };

        for (key, value) in group_repeated_keys(pairs) {
            req.query_params_mut().insert(key, value);
        }
    }
}

/// Empty values keep their key present but never land in a joined value
fn group_repeated_keys(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut grouped: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        match grouped.iter_mut().find(|(existing, _)| *existing == key) {
            Some(_) if value.is_empty() => {}
            Some((_, joined)) if joined.is_empty() => *joined = value,
            Some((_, joined)) => {
                joined.push(',');
                joined.push_str(&value);
            }
            None => grouped.push((key, value)),
        }
    }
    grouped
}

#[async_trait]
impl Middleware for QueryString {
    async fn handle(&self, req: &mut RequestContext, res: &mut ResponseSink, next: Next<'_>) {
        if let Some(query) = req.uri().query().map(str::to_owned) {
            Self::parse_into(&query, req);
        }
        next.run(req, res).await;
    }
}
