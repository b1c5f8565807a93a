use std::io::Cursor;

use rocket::fairing::{self, Fairing, Info, Kind};
use rocket::http::{Header, Method, Status};
use rocket::outcome::Outcome;
use rocket::route::{self, Route};
use rocket::tokio::io::AsyncReadExt;
use rocket::{uri, Build, Data, Request, Response, Rocket};

use crate::conversions::{to_conditional_request, to_response_meta};
use etag_guard_core::{ConditionalRequest, EtagConfig, EtagGuard, RequestVerdict};

const REJECTION_BASE: &str = "/__etag_guard";

/// ETag middleware.
#[derive(Default, Clone)]
pub struct EtagFairing {
    guard: EtagGuard,
}

impl EtagFairing {
    /// Create a new fairing with its own fingerprint store.
    #[must_use]
    pub fn new(config: EtagConfig) -> Self {
        EtagFairing {
            guard: EtagGuard::new(config),
        }
    }

    /// Create a fairing sharing the store of an existing guard.
    #[must_use]
    pub fn from_guard(guard: EtagGuard) -> Self {
        EtagFairing { guard }
    }

    #[must_use]
    pub fn guard(&self) -> &EtagGuard {
        &self.guard
    }
}

/// Decision taken in `on_request`, read back in `on_response`.
struct Tracked {
    request: ConditionalRequest,
    verdict: RequestVerdict,
}

#[rocket::async_trait]
impl Fairing for EtagFairing {
    fn info(&self) -> Info {
        Info {
            name: "ETag guard",
            kind: Kind::Ignite | Kind::Request | Kind::Response,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
        Ok(rocket.mount(REJECTION_BASE, vec![precondition_failed_route()]))
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let request = to_conditional_request(req);
        let verdict = self.guard.evaluate_request(&request);

        if matches!(verdict, RequestVerdict::PreconditionFailed { .. }) {
            // fairings can't answer directly: reroute so no user handler runs
            req.set_method(Method::Get);
            req.set_uri(uri!("/__etag_guard/precondition-failed"));
        }

        req.local_cache(|| Some(Tracked { request, verdict }));
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, resp: &mut Response<'r>) {
        let Some(tracked) = req.local_cache(|| None::<Tracked>) else {
            return;
        };

        match tracked.verdict {
            RequestVerdict::Bypass => return,
            RequestVerdict::PreconditionFailed { .. } => {
                *resp = precondition_failed_response();
                return;
            }
            RequestVerdict::Proceed => {}
        }

        if !self.guard.should_fingerprint(&to_response_meta(resp)) {
            return;
        }

        let mut body = std::mem::take(resp.body_mut());
        // one byte past the limit tells an oversized body apart
        let limit = u64::try_from(self.guard.config().max_body_bytes).unwrap_or(u64::MAX);
        let mut bytes = Vec::new();
        let read = AsyncReadExt::take(&mut body, limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .await;

        if let Err(err) = read {
            log::error!(
                "Failed to buffer response body for {}: {err}",
                tracked.request.resource_key
            );
            *resp = internal_server_error_response();
            return;
        }

        if !self.guard.within_body_limit(bytes.len()) {
            resp.set_streamed_body(Cursor::new(bytes).chain(body));
            return;
        }

        let completion = self.guard.complete(&tracked.request, &bytes);
        resp.set_header(Header::new("ETag", completion.fingerprint.quoted()));

        if completion.not_modified {
            resp.set_status(Status::NotModified);
            resp.set_sized_body(0, Cursor::new(Vec::new()));
            return;
        }

        resp.set_sized_body(bytes.len(), Cursor::new(bytes));
    }
}

fn precondition_failed_route() -> Route {
    Route::new(Method::Get, "/precondition-failed", precondition_failed)
}

/// Answers only requests rerouted by `on_request`; direct hits are forwarded.
fn precondition_failed<'r>(req: &'r Request<'_>, data: Data<'r>) -> route::BoxFuture<'r> {
    let rerouted = matches!(
        req.local_cache(|| None::<Tracked>),
        Some(Tracked {
            verdict: RequestVerdict::PreconditionFailed { .. },
            ..
        })
    );

    let outcome = if rerouted {
        Outcome::Success(precondition_failed_response())
    } else {
        Outcome::Forward((data, Status::NotFound))
    };
    Box::pin(std::future::ready(outcome))
}

fn precondition_failed_response<'r>() -> Response<'r> {
    let mut response = Response::new();
    response.set_sized_body(0, Cursor::new(Vec::new()));
    response.set_status(Status::PreconditionFailed);
    response
}

fn internal_server_error_response<'r>() -> Response<'r> {
    let mut response = Response::new();
    let body = "Internal server error";
    response.set_sized_body(body.len(), Cursor::new(body));
    response.set_status(Status::InternalServerError);
    response
}
