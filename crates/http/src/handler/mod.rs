//! The seam between a connection and whatever serves its requests
//!
//! A [`Handler`] receives one [`CompleteRequest`] together with the outbound channel of the
//! connection it arrived on. It answers by emitting a header commit, body chunks and an end event
//! through that channel; the connection does not inspect or wait for the response.
//!
//! Use [`make_handler`] to turn an async closure into a handler.

use async_trait::async_trait;

use crate::connection::CompleteRequest;
use crate::protocol::ResponseChannel;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: CompleteRequest, channel: Box<dyn ResponseChannel>);
}

/// A [`Handler`] backed by a plain async function, built with [`make_handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(CompleteRequest, Box<dyn ResponseChannel>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn call(&self, request: CompleteRequest, channel: Box<dyn ResponseChannel>) {
        (self.f)(request, channel).await;
    }
}

pub fn make_handler<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(CompleteRequest, Box<dyn ResponseChannel>) -> Fut,
    Fut: Future<Output = ()>,
{
    HandlerFn { f }
}
