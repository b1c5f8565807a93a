mod config;
mod error;
mod fingerprint;
mod policy;
mod request;
mod store;

pub use config::{
    EtagConfig, ENV_CONTENT_TYPE_MARKER, ENV_ENFORCE_PRECONDITIONS, ENV_MAX_BODY_BYTES,
    ENV_STORE_CAPACITY, ENV_STORE_TTL_SECS,
};
pub use error::ConfigError;
pub use fingerprint::Fingerprint;
pub use policy::{MethodClass, RequestVerdict, check_precondition, is_fingerprintable};
pub use request::{ConditionalRequest, ResponseMeta, unquote};
pub use store::FingerprintStore;

use std::sync::Arc;

/// Result of fingerprinting a buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub fingerprint: Fingerprint,
    /// The client's cached copy is current: answer 304 with an empty body.
    pub not_modified: bool,
}

/// Shared entry point used by every framework adapter.
///
/// Cloning is cheap and clones share the same [`FingerprintStore`].
#[derive(Clone, Debug)]
pub struct EtagGuard {
    config: Arc<EtagConfig>,
    store: Arc<FingerprintStore>,
}

impl Default for EtagGuard {
    fn default() -> Self {
        Self::new(EtagConfig::default())
    }
}

impl EtagGuard {
    #[must_use]
    pub fn new(config: EtagConfig) -> Self {
        let store = FingerprintStore::bounded(config.store_capacity, config.store_ttl());
        Self::with_store(config, Arc::new(store))
    }

    /// Builds a guard around an existing store, e.g. one shared with handlers.
    #[must_use]
    pub fn with_store(config: EtagConfig, store: Arc<FingerprintStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EtagConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<FingerprintStore> {
        &self.store
    }

    /// Decides what to do with a request before its handler runs.
    #[must_use]
    pub fn evaluate_request(&self, req: &ConditionalRequest) -> RequestVerdict {
        let class = MethodClass::of(&req.method);
        if !class.participates() {
            return RequestVerdict::Bypass;
        }

        if class == MethodClass::Conditional && self.config.enforce_preconditions {
            if let Some(supplied) = req.if_match.as_deref() {
                let current = self.store.get(&req.resource_key);
                if !check_precondition(Some(supplied), current.as_deref()) {
                    log::debug!(
                        "Precondition failed for {} {}",
                        req.method,
                        req.resource_key
                    );
                    return RequestVerdict::PreconditionFailed {
                        supplied: supplied.to_string(),
                        current: current.unwrap_or_default(),
                    };
                }
            }
        }

        RequestVerdict::Proceed
    }

    /// Whether the handler's response should be buffered and fingerprinted.
    #[must_use]
    pub fn should_fingerprint(&self, meta: &ResponseMeta) -> bool {
        if !is_fingerprintable(meta, &self.config.content_type_marker) {
            return false;
        }

        meta.content_length
            .is_none_or(|len| self.within_body_limit(len))
    }

    /// Whether `len` body bytes may still be buffered for fingerprinting.
    ///
    /// Adapters reading a body of unknown length call this as bytes arrive and
    /// pass the response through untagged once it returns `false`.
    #[must_use]
    pub fn within_body_limit(&self, len: usize) -> bool {
        if len > self.config.max_body_bytes {
            log::warn!(
                "Response body of {len}+ bytes exceeds the {} byte limit, skipping ETag",
                self.config.max_body_bytes
            );
            return false;
        }
        true
    }

    /// Fingerprints a buffered body, records it and decides on 304.
    #[must_use]
    pub fn complete(&self, req: &ConditionalRequest, body: &[u8]) -> Completion {
        let fingerprint = Fingerprint::of(body);
        log::trace!("Storing ETag {fingerprint} for {}", req.resource_key);
        self.store.set(&req.resource_key, fingerprint.as_str());

        let not_modified = MethodClass::of(&req.method) == MethodClass::Cacheable
            && req.if_none_match.as_deref() == Some(fingerprint.as_str());
        if not_modified {
            log::debug!("Not modified: {}", req.resource_key);
        }

        Completion {
            fingerprint,
            not_modified,
        }
    }
}
