use actix_web::body::{BodySize, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderMap, HeaderName, CONTENT_TYPE, IF_MATCH, IF_NONE_MATCH};

use etag_guard_core::{ConditionalRequest, ResponseMeta};

pub(crate) fn to_conditional_request(req: &ServiceRequest) -> ConditionalRequest {
    let headers = req.headers();

    ConditionalRequest::new(
        req.method().as_str(),
        req.path(),
        header_value(headers, &IF_MATCH),
        header_value(headers, &IF_NONE_MATCH),
    )
}

pub(crate) fn to_response_meta<B: MessageBody>(res: &ServiceResponse<B>) -> ResponseMeta {
    let content_length = match res.response().body().size() {
        BodySize::Sized(len) => usize::try_from(len).ok(),
        BodySize::None | BodySize::Stream => None,
    };

    ResponseMeta {
        status: res.status().as_u16(),
        content_type: header_value(res.headers(), &CONTENT_TYPE).map(str::to_string),
        content_length,
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
