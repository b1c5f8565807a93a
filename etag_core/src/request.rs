/// What the middleware needs to know about an incoming request.
///
/// Adapters build this from their framework's request type before the
/// handler runs and keep it around until the response is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalRequest {
    /// Request path, used as the key in the fingerprint store.
    pub resource_key: String,
    /// HTTP method, upper case.
    pub method: String,
    /// `If-Match` value with quotes removed.
    pub if_match: Option<String>,
    /// `If-None-Match` value with quotes removed.
    pub if_none_match: Option<String>,
}

impl ConditionalRequest {
    /// # Arguments
    ///
    /// * `method` - Request method as sent by the client.
    /// * `path` - Request path without query string.
    /// * `if_match` - Raw first `If-Match` header value, if any.
    /// * `if_none_match` - Raw first `If-None-Match` header value, if any.
    #[must_use]
    pub fn new(
        method: &str,
        path: &str,
        if_match: Option<&str>,
        if_none_match: Option<&str>,
    ) -> Self {
        Self {
            resource_key: path.to_string(),
            method: method.to_ascii_uppercase(),
            if_match: if_match.and_then(unquote),
            if_none_match: if_none_match.and_then(unquote),
        }
    }
}

/// Status and content type of the handler's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub content_type: Option<String>,
    /// Body length when the framework knows it up front.
    pub content_length: Option<usize>,
}

/// Strips every double quote from a validator header value.
///
/// Returns `None` when nothing but quotes (or nothing at all) was sent.
#[must_use]
pub fn unquote(value: &str) -> Option<String> {
    let stripped: String = value.chars().filter(|c| *c != '"').collect();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}
