use std::error::Error as StdError;
use std::future::{poll_fn, ready, Future};
use std::pin::Pin;
use std::rc::Rc;

use actix_web::body::{BodyStream, BoxBody, MessageBody};
use actix_web::http::header::{HeaderValue, CONTENT_LENGTH, ETAG};
use actix_web::http::StatusCode;
use actix_web::web::Bytes;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use etag_guard_core::{EtagConfig, EtagGuard, RequestVerdict};
use futures_util::stream::{self, StreamExt};

use crate::conversions::{to_conditional_request, to_response_meta};

#[derive(Default, Clone)]
/// ETag middleware factory.
pub struct EtagLayer(EtagGuard);

impl EtagLayer {
    /// Create a new middleware factory with its own fingerprint store.
    ///
    /// Workers created by `HttpServer` from clones of the same factory share
    /// that store.
    ///
    /// # Arguments
    ///
    /// * `config` - Body limit, store bounds and precondition enforcement.
    #[must_use]
    pub fn new(config: EtagConfig) -> Self {
        EtagLayer(EtagGuard::new(config))
    }

    /// Create a factory sharing the store of an existing guard.
    #[must_use]
    pub fn from_guard(guard: EtagGuard) -> Self {
        EtagLayer(guard)
    }

    #[must_use]
    pub fn guard(&self) -> &EtagGuard {
        &self.0
    }
}

type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T> + 'static>>;

impl<S> Transform<S, ServiceRequest> for EtagLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = S::Response;
    type Error = Error;
    type Transform = EtagMiddleware<S>;
    type InitError = ();
    type Future = LocalBoxFuture<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let guard = self.0.clone();
        Box::pin(async move {
            Ok(EtagMiddleware {
                guard,
                next_service: Rc::new(service),
            })
        })
    }
}

pub struct EtagMiddleware<S> {
    guard: EtagGuard,
    next_service: Rc<S>,
}

impl<S> Service<ServiceRequest> for EtagMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = S::Response;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    // this service is ready when its next service is ready
    forward_ready!(next_service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let guard = self.guard.clone();
        let next_service = self.next_service.clone();

        Box::pin(async move {
            let request = to_conditional_request(&req);

            match guard.evaluate_request(&request) {
                RequestVerdict::Bypass => return next_service.call(req).await,
                RequestVerdict::PreconditionFailed { .. } => {
                    return Ok(req.into_response(HttpResponse::PreconditionFailed().finish()));
                }
                RequestVerdict::Proceed => {}
            }

            let resp: ServiceResponse = next_service.call(req).await?;

            if !guard.should_fingerprint(&to_response_meta(&resp)) {
                return Ok(resp);
            }

            let (http_req, http_res) = resp.into_parts();
            let (mut head, body) = http_res.into_parts();

            let bytes = match buffer_within_limit(body, &guard).await {
                Ok(Buffered::Complete(bytes)) => bytes,
                Ok(Buffered::Overflow(body)) => {
                    return Ok(ServiceResponse::new(http_req, head.set_body(body)));
                }
                Err(err) => {
                    log::error!(
                        "Failed to buffer response body for {}: {err}",
                        request.resource_key
                    );
                    return Ok(ServiceResponse::new(
                        http_req,
                        internal_server_error_response(),
                    ));
                }
            };

            let completion = guard.complete(&request, &bytes);
            if let Ok(etag) = HeaderValue::from_str(&completion.fingerprint.quoted()) {
                head.headers_mut().insert(ETAG, etag);
            }

            if completion.not_modified {
                *head.status_mut() = StatusCode::NOT_MODIFIED;
                head.headers_mut()
                    .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
                return Ok(ServiceResponse::new(
                    http_req,
                    head.set_body(BoxBody::new(())),
                ));
            }

            Ok(ServiceResponse::new(
                http_req,
                head.set_body(BoxBody::new(bytes)),
            ))
        })
    }
}

enum Buffered {
    Complete(Bytes),
    /// Limit exceeded: the bytes read so far followed by the unread rest.
    Overflow(BoxBody),
}

async fn buffer_within_limit(
    body: BoxBody,
    guard: &EtagGuard,
) -> Result<Buffered, Box<dyn StdError>> {
    let mut body = Box::pin(body);
    let mut buffered = Vec::new();

    loop {
        let Some(chunk) = poll_fn(|cx| body.as_mut().poll_next(cx)).await else {
            break;
        };
        buffered.extend_from_slice(&chunk?);
        if !guard.within_body_limit(buffered.len()) {
            let head = stream::once(ready(Ok::<_, Box<dyn StdError>>(Bytes::from(buffered))));
            let rest = stream::poll_fn(move |cx| body.as_mut().poll_next(cx));
            return Ok(Buffered::Overflow(BoxBody::new(BodyStream::new(head.chain(rest)))));
        }
    }

    Ok(Buffered::Complete(Bytes::from(buffered)))
}

fn internal_server_error_response() -> HttpResponse {
    HttpResponse::InternalServerError().body("Internal server error")
}
