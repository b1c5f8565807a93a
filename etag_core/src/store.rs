use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Last known fingerprint for every resource key seen by the middleware.
///
/// Reads and writes never fail and never block other keys. Concurrent writers
/// to the same key race, and the last write wins.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    entries: DashMap<String, Entry>,
    capacity: Option<usize>,
    ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
struct Entry {
    fingerprint: String,
    stored_at: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.stored_at.elapsed() >= ttl)
    }
}

impl FingerprintStore {
    /// Unbounded store: entries live for the whole process.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bounded by entry count and/or entry age.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of keys kept; the oldest write is evicted first.
    /// * `ttl` - Age after which an entry reads as absent.
    ///
    /// A zero capacity or zero TTL leaves that dimension unbounded.
    #[must_use]
    pub fn bounded(capacity: Option<usize>, ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.filter(|c| *c > 0),
            ttl: ttl.filter(|t| !t.is_zero()),
        }
    }

    pub fn get(&self, resource_key: &str) -> Option<String> {
        let entry = self.entries.get(resource_key)?;
        if entry.is_expired(self.ttl) {
            drop(entry);
            self.entries
                .remove_if(resource_key, |_, e| e.is_expired(self.ttl));
            return None;
        }
        Some(entry.fingerprint.clone())
    }

    pub fn set(&self, resource_key: &str, fingerprint: impl Into<String>) {
        if let Some(capacity) = self.capacity {
            if !self.entries.contains_key(resource_key) {
                while self.entries.len() >= capacity {
                    if !self.evict_oldest() {
                        break;
                    }
                }
            }
        }

        self.entries.insert(
            resource_key.to_string(),
            Entry {
                fingerprint: fingerprint.into(),
                stored_at: Instant::now(),
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().stored_at)
            .map(|e| e.key().clone());

        match oldest {
            Some(key) => {
                log::trace!("Evicting fingerprint for {key}");
                self.entries.remove(&key).is_some()
            }
            None => false,
        }
    }
}
