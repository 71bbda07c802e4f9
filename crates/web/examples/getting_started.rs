use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use http::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use switchyard_http::connection::HttpConnection;
use switchyard_http::protocol::{Message, ParseError, PayloadItem, RequestHeader};
use switchyard_web::handler::{no_input_sync, raw_sync, typed, typed_with_request};
use switchyard_web::middleware::{Flow, from_fn};
use switchyard_web::{Dispatcher, ErrorInfo, Middleware, Next, RequestContext, ResponseSink, Router};
use tokio::sync::mpsc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Serialize, Debug)]
struct Echo {
    msg: String,
}

#[derive(Deserialize, Debug)]
struct Item {
    id: u32,
    verbose: Option<bool>,
}

/// Logs every request with its latency
struct AccessLog;

#[async_trait]
impl Middleware for AccessLog {
    async fn handle(&self, req: &mut RequestContext, res: &mut ResponseSink, next: Next<'_>) {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_owned();
        next.run(req, res).await;
        info!(%method, path = %path, status = %res.status(), elapsed = ?start.elapsed(), "request served");
    }
}

async fn find_item(item: Item) -> Result<serde_json::Value, ErrorInfo> {
    if item.id == 0 {
        return Err(ErrorInfo::message(StatusCode::NOT_FOUND, "no such item"));
    }
    Ok(serde_json::json!({ "id": item.id, "verbose": item.verbose.unwrap_or(false) }))
}

fn request_events(method: Method, uri: &str, body: Option<&'static str>) -> Vec<Result<Message<RequestHeader>, ParseError>> {
    let header = Request::builder().method(method).uri(uri).body(()).unwrap().into();
    let mut events = vec![Ok(Message::Header(header))];
    if let Some(body) = body {
        events.push(Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(body.as_bytes())))));
    }
    events.push(Ok(Message::Payload(PayloadItem::Eof(None))));
    events
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::new();
    router
        .add(AccessLog)
        .add(from_fn(|req, res| {
            if req.path().starts_with("/admin") {
                let _ = res.set_status(StatusCode::FORBIDDEN);
                res.write_text("forbidden");
                return Flow::Stop;
            }
            Flow::Proceed
        }))
        .get("/ping", no_input_sync(|| Ok::<_, Infallible>("pong")))
        .post("/echo", typed_with_request(|echo: Echo, req: RequestContext| async move {
            info!(agent = ?req.header(http::header::USER_AGENT), "echo");
            Ok::<_, Infallible>(echo)
        }))
        .get("/items/:id", typed(find_item))
        .get(
            "/whoami/:name",
            raw_sync(|req: RequestContext| {
                Ok::<_, Infallible>(format!("{} via {}", req.path_param("name").unwrap_or_default(), req.uri()))
            }),
        );

    let dispatcher = Arc::new(Dispatcher::new(router));

    let events = [
        request_events(Method::GET, "/ping", None),
        request_events(Method::POST, "/echo", Some(r#"{"msg":"hi"}"#)),
        request_events(Method::POST, "/echo", Some("{}")),
        request_events(Method::GET, "/items/7?verbose=true", None),
        request_events(Method::GET, "/items/0", None),
        request_events(Method::GET, "/whoami/ann", None),
        request_events(Method::GET, "/admin/users", None),
        request_events(Method::GET, "/nowhere", None),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection = HttpConnection::new(stream::iter(events), tx);
    if let Err(e) = connection.process(dispatcher).await {
        tracing::error!(cause = %e, "connection failed");
    }

    while let Some(message) = rx.recv().await {
        match message {
            Message::Header(head) => println!("<- {}", head.status()),
            Message::Payload(PayloadItem::Chunk(bytes)) => println!("   {}", String::from_utf8_lossy(&bytes)),
            Message::Payload(PayloadItem::Eof(_)) => println!(),
        }
    }
}
