//! Serving archive entries over HTTP.
//!
//! [`serve_file`] answers one request: method gating, lookup, conditional
//! GET and response headers, with archive work kept off the async runtime.
//! [`router`] mounts it in an axum [`Router`].
//!
//! Status mapping:
//!
//! | Outcome                         | Status |
//! |---------------------------------|--------|
//! | method other than GET/HEAD      | 405, `Allow: GET, HEAD` |
//! | no entry, no index fallback     | 404 |
//! | client copy still fresh         | 304 |
//! | archive closed                  | 503 |
//! | storage or decompression error  | 500 |

mod conditional;

pub use conditional::{format_http_date, is_not_modified, parse_http_date};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::response::Builder;
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use std::io::{self, Read};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::Error;
use crate::io::ReadAt;
use crate::zip::{Archive, EntryStream};

/// Value of the `Allow` header on 405 responses.
pub const ALLOWED_METHODS: &str = "GET, HEAD";

const OCTET_STREAM: &str = "application/octet-stream";

/// Bytes decompressed per body chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the decompressing thread and the connection.
const CHUNKS_IN_FLIGHT: usize = 4;

/// Build a router serving `archive` under `prefix` (e.g. `/` or `/static`).
pub fn router<R: ReadAt + 'static>(archive: Arc<Archive<R>>, prefix: &str) -> Router {
    let base = prefix.trim_matches('/');
    let routes = if base.is_empty() {
        Router::new()
            .route("/", any(serve_root::<R>))
            .route("/{*path}", any(serve_path::<R>))
    } else {
        Router::new()
            .route(&format!("/{base}"), any(serve_root::<R>))
            .route(&format!("/{base}/"), any(serve_root::<R>))
            .route(&format!("/{base}/{{*path}}"), any(serve_path::<R>))
    };
    routes.fallback(unmatched).with_state(archive)
}

async fn serve_root<R: ReadAt + 'static>(
    State(archive): State<Arc<Archive<R>>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    serve_file(archive, method, String::from("/"), headers).await
}

async fn serve_path<R: ReadAt + 'static>(
    State(archive): State<Arc<Archive<R>>>,
    method: Method,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Response {
    serve_file(archive, method, path, headers).await
}

/// Requests outside the prefix: still gate methods first, then 404.
async fn unmatched(method: Method) -> Response {
    if !is_read_method(&method) {
        return method_not_allowed();
    }
    not_found()
}

/// What the blocking half of a request produced.
enum Reply<R: ReadAt> {
    /// A complete response: errors, 304 and HEAD.
    Done(Response),
    /// 200 headers for a GET whose body is read from the stream.
    Body(Builder, EntryStream<R>),
}

/// Answer one request for `path` from `archive`.
///
/// Lookup and header work run on the blocking pool. A GET body is
/// decompressed there too and handed to the response in chunks.
pub async fn serve_file<R: ReadAt + 'static>(
    archive: Arc<Archive<R>>,
    method: Method,
    path: String,
    headers: HeaderMap,
) -> Response {
    let reply =
        tokio::task::spawn_blocking(move || respond(&archive, &method, &path, &headers)).await;
    match reply {
        Ok(Reply::Done(response)) => response,
        Ok(Reply::Body(builder, stream)) => builder
            .body(stream_body(stream))
            .unwrap_or_else(|_| internal_error()),
        Err(err) => {
            error!(error = %err, "archive worker failed");
            internal_error()
        }
    }
}

fn respond<R: ReadAt>(
    archive: &Archive<R>,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> Reply<R> {
    if !is_read_method(method) {
        return Reply::Done(method_not_allowed());
    }

    let stream = match archive.open_file(path) {
        Ok(stream) => stream,
        Err(Error::NotFound(_)) => return Reply::Done(not_found()),
        Err(Error::Closed) => {
            return Reply::Done(
                (StatusCode::SERVICE_UNAVAILABLE, "archive is closed").into_response(),
            );
        }
        Err(err) => {
            error!(path, error = %err, "failed to open archive entry");
            return Reply::Done(internal_error());
        }
    };

    let etag = stream.etag();
    let last_modified = format_http_date(archive.modified());

    if is_not_modified(headers, &etag, archive.modified()) {
        debug!(path, "not modified");
        return Reply::Done(
            Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::ETAG, &etag)
                .header(header::LAST_MODIFIED, &last_modified)
                .body(Body::empty())
                .unwrap_or_else(|_| internal_error()),
        );
    }

    let content_type = mime_guess::from_path(stream.path())
        .first_raw()
        .unwrap_or(OCTET_STREAM);

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::LAST_MODIFIED, &last_modified)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ETAG, &etag)
        .header(header::CONTENT_LENGTH, stream.size());

    if method == Method::HEAD {
        return Reply::Done(builder.body(Body::empty()).unwrap_or_else(|_| internal_error()));
    }
    Reply::Body(builder, stream)
}

/// Decompress `stream` on the blocking pool and feed it to the body through
/// a bounded channel, so at most a few chunks are buffered per request.
fn stream_body<R: ReadAt + 'static>(mut stream: EntryStream<R>) -> Body {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(CHUNKS_IN_FLIGHT);

    tokio::task::spawn_blocking(move || {
        loop {
            let mut chunk = vec![0u8; CHUNK_SIZE];
            let item = match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    chunk.truncate(n);
                    Ok(Bytes::from(chunk))
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!(path = stream.path(), error = %err, "failed to read archive entry");
                    Err(err)
                }
            };
            let failed = item.is_err();
            // A send error means the client went away.
            if tx.blocking_send(item).is_err() || failed {
                break;
            }
        }
    });

    let chunks = futures::stream::unfold(rx, |mut rx| async move {
        let item = rx.recv().await?;
        Some((item, rx))
    });
    Body::from_stream(chunks)
}

fn is_read_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, ALLOWED_METHODS)],
        "Method Not Allowed",
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found").into_response()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
