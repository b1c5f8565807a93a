use axum::body::HttpBody;
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, IF_MATCH, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderName};
use axum::response::Response;

use etag_guard_core::{ConditionalRequest, ResponseMeta};

pub(crate) fn to_conditional_request(req: &Request) -> ConditionalRequest {
    let headers = req.headers();

    ConditionalRequest::new(
        req.method().as_str(),
        req.uri().path(),
        header_value(headers, &IF_MATCH),
        header_value(headers, &IF_NONE_MATCH),
    )
}

pub(crate) fn to_response_meta(res: &Response) -> ResponseMeta {
    let headers = res.headers();

    let content_length = header_value(headers, &CONTENT_LENGTH)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .or_else(|| {
            res.body()
                .size_hint()
                .exact()
                .and_then(|len| usize::try_from(len).ok())
        });

    ResponseMeta {
        status: res.status().as_u16(),
        content_type: header_value(headers, &CONTENT_TYPE).map(str::to_string),
        content_length,
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
