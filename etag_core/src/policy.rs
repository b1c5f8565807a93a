use crate::request::ResponseMeta;

/// How a request method takes part in conditional request handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// GET: fingerprinted, may be answered with 304.
    Cacheable,
    /// PUT and PATCH: precondition checked, fingerprinted.
    Conditional,
    /// POST and DELETE: never touched.
    Excluded,
    /// Anything else: passed through untouched.
    Untracked,
}

impl MethodClass {
    /// Classifies an upper-case method name.
    #[must_use]
    pub fn of(method: &str) -> Self {
        match method {
            "GET" => MethodClass::Cacheable,
            "PUT" | "PATCH" => MethodClass::Conditional,
            "POST" | "DELETE" => MethodClass::Excluded,
            _ => MethodClass::Untracked,
        }
    }

    #[must_use]
    pub fn participates(self) -> bool {
        matches!(self, MethodClass::Cacheable | MethodClass::Conditional)
    }
}

/// Outcome of looking at a request before its handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestVerdict {
    /// Mechanism does not apply; forward request and response untouched.
    Bypass,
    /// Run the handler, then fingerprint its response.
    Proceed,
    /// Client's `If-Match` is stale; answer 412 without running the handler.
    PreconditionFailed { supplied: String, current: String },
}

/// Compares the client's `If-Match` against the last stored fingerprint.
///
/// Only a supplied value that differs from a stored one fails; a missing
/// header or an unknown resource lets the request through.
#[must_use]
pub fn check_precondition(if_match: Option<&str>, current: Option<&str>) -> bool {
    match (if_match, current) {
        (Some(supplied), Some(current)) => supplied == current,
        _ => true,
    }
}

/// A response is fingerprinted only when it is a 200 whose content type
/// contains `marker` (case-insensitive).
#[must_use]
pub fn is_fingerprintable(meta: &ResponseMeta, marker: &str) -> bool {
    if meta.status != 200 {
        return false;
    }

    meta.content_type.as_deref().is_some_and(|content_type| {
        content_type
            .to_ascii_lowercase()
            .contains(&marker.to_ascii_lowercase())
    })
}
