use std::future::{ready, Future};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_LENGTH, ETAG};
use axum::http::{HeaderValue, StatusCode};
use axum::{extract::Request, response::Response};
use futures_util::stream::{self, StreamExt};
use std::task::{Context, Poll};
use tower::{Layer, Service};

use etag_guard_core::{EtagConfig, EtagGuard, RequestVerdict};

use crate::conversions::{to_conditional_request, to_response_meta};

#[derive(Default, Clone)]
/// ETag middleware layer.
pub struct EtagLayer(EtagGuard);

impl EtagLayer {
    /// Create a new layer with its own fingerprint store.
    ///
    /// # Arguments
    ///
    /// * `config` - Body limit, store bounds and precondition enforcement.
    #[must_use]
    pub fn new(config: EtagConfig) -> Self {
        EtagLayer(EtagGuard::new(config))
    }

    /// Create a layer sharing the store of an existing guard.
    #[must_use]
    pub fn from_guard(guard: EtagGuard) -> Self {
        EtagLayer(guard)
    }

    #[must_use]
    pub fn guard(&self) -> &EtagGuard {
        &self.0
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

impl<S> Layer<S> for EtagLayer {
    type Service = EtagMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EtagMiddleware {
            guard: self.0.clone(),
            next_service: Arc::new(Mutex::new(inner)),
        }
    }
}

pub struct EtagMiddleware<S> {
    guard: EtagGuard,
    next_service: Arc<Mutex<S>>,
}

impl<S> Clone for EtagMiddleware<S> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            next_service: self.next_service.clone(),
        }
    }
}

impl<S> Service<Request> for EtagMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        lock(&self.next_service).poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let guard = self.guard.clone();
        let next_service = self.next_service.clone();

        Box::pin(async move {
            let request = to_conditional_request(&req);

            match guard.evaluate_request(&request) {
                RequestVerdict::Bypass => {
                    let fut = lock(&next_service).call(req);
                    return fut.await;
                }
                RequestVerdict::PreconditionFailed { .. } => {
                    return Ok(precondition_failed_response());
                }
                RequestVerdict::Proceed => {}
            }

            let fut = lock(&next_service).call(req);

            let resp: Response = fut.await?;

            if !guard.should_fingerprint(&to_response_meta(&resp)) {
                return Ok(resp);
            }

            let (mut parts, body) = resp.into_parts();
            let bytes = match buffer_within_limit(body, &guard).await {
                Ok(Buffered::Complete(bytes)) => bytes,
                Ok(Buffered::Overflow(body)) => return Ok(Response::from_parts(parts, body)),
                Err(err) => {
                    log::error!(
                        "Failed to buffer response body for {}: {err}",
                        request.resource_key
                    );
                    return Ok(internal_server_error_response());
                }
            };

            let completion = guard.complete(&request, &bytes);
            if let Ok(etag) = HeaderValue::from_str(&completion.fingerprint.quoted()) {
                parts.headers.insert(ETAG, etag);
            }

            if completion.not_modified {
                parts.status = StatusCode::NOT_MODIFIED;
                parts
                    .headers
                    .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
                return Ok(Response::from_parts(parts, Body::empty()));
            }

            Ok(Response::from_parts(parts, Body::from(bytes)))
        })
    }
}

enum Buffered {
    Complete(Bytes),
    /// Limit exceeded: the bytes read so far followed by the unread rest.
    Overflow(Body),
}

async fn buffer_within_limit(body: Body, guard: &EtagGuard) -> Result<Buffered, axum::Error> {
    let mut stream = body.into_data_stream();
    let mut buffered = Vec::new();

    loop {
        let Some(chunk) = stream.next().await else {
            break;
        };
        buffered.extend_from_slice(&chunk?);
        if !guard.within_body_limit(buffered.len()) {
            let head = stream::once(ready(Ok::<_, axum::Error>(Bytes::from(buffered))));
            return Ok(Buffered::Overflow(Body::from_stream(head.chain(stream))));
        }
    }

    Ok(Buffered::Complete(Bytes::from(buffered)))
}

fn lock<S>(service: &Mutex<S>) -> MutexGuard<'_, S> {
    service.lock().unwrap_or_else(PoisonError::into_inner)
}

fn precondition_failed_response() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::PRECONDITION_FAILED;
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
    response
}

fn internal_server_error_response() -> Response {
    let mut response = Response::new(Body::from("Internal server error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
