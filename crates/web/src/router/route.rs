use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use tracing::debug;

use super::pattern::RoutePattern;
use crate::error::ErrorMapper;
use crate::handler::RouteHandler;
use crate::middleware::{Middleware, Next};
use crate::request::RequestContext;
use crate::response::ResponseSink;

/// A middleware entry that owns one `(method, pattern, handler)` registration.
///
/// On a method and path match the route binds the path parameters, runs the handler and writes
/// exactly one response: the handler's output, or its failure classified by the error mapper.
/// A matched route never continues the chain. Anything else is passed on untouched.
pub struct Route {
    method: Method,
    pattern: RoutePattern,
    handler: RouteHandler,
    error_mapper: Arc<dyn ErrorMapper>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl Route {
    pub fn new(method: Method, pattern: RoutePattern, handler: RouteHandler, error_mapper: Arc<dyn ErrorMapper>) -> Self {
        Self { method, pattern, handler, error_mapper }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

#[async_trait]
impl Middleware for Route {
    async fn handle(&self, req: &mut RequestContext, res: &mut ResponseSink, next: Next<'_>) {
        let matched = if req.method() == self.method { self.pattern.matches(req.path()) } else { None };
        let Some(params) = matched else {
            next.run(req, res).await;
            return;
        };

        debug!(method = %self.method, pattern = %self.pattern, path = req.path(), "route matched");
        req.path_params_mut().extend_from(&params);

        match self.handler.invoke(req).await {
            Ok(output) => output.write_to(res),
            Err(e) => {
                let info = self.error_mapper.classify(e);
                debug!(status = %info.status(), pattern = %self.pattern, "route failed");
                res.write_error(info);
            }
        }
    }
}
