use rocket::{Request, Response};

use etag_guard_core::{ConditionalRequest, ResponseMeta};

pub(crate) fn to_conditional_request(req: &Request) -> ConditionalRequest {
    let headers = req.headers();

    ConditionalRequest::new(
        req.method().as_str(),
        req.uri().path().as_str(),
        headers.get_one("If-Match"),
        headers.get_one("If-None-Match"),
    )
}

pub(crate) fn to_response_meta(res: &Response) -> ResponseMeta {
    ResponseMeta {
        status: res.status().code,
        content_type: res.headers().get_one("Content-Type").map(str::to_string),
        content_length: res.body().preset_size(),
    }
}
