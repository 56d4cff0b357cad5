// In-memory response cache.
// One entry per bound operation, replaced wholesale on every fetch.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::OperationKey;
use crate::error::{QuillError, Result};
use crate::github::types::GraphQLError;

/// A cached response, both halves of the envelope plus the write time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The response's `data` payload, if any.
    pub data: Option<Value>,
    /// The response's `errors` array, if any.
    pub errors: Option<Vec<GraphQLError>>,
    /// When the entry was last written or patched.
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(data: Option<Value>, errors: Option<Vec<GraphQLError>>) -> Self {
        Self {
            data,
            errors,
            cached_at: Utc::now(),
        }
    }
}

/// Store of responses keyed by operation identity.
///
/// The interior lock makes each write and patch atomic with respect to
/// reads; a reader sees an entry either before or after a patch, never
/// mid-rewrite.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<OperationKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the entry for a key. Never creates or mutates entries.
    pub fn read(&self, key: &OperationKey) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    /// Store a response wholesale, replacing any previous entry.
    ///
    /// Called after every settled fetch: a failure is stored too, with no
    /// data and the failure in the errors half.
    pub fn write(&self, key: OperationKey, data: Option<Value>, errors: Option<Vec<GraphQLError>>) {
        self.lock().insert(key, CacheEntry::new(data, errors));
    }

    /// Rewrite the data of an existing entry in place.
    ///
    /// Fails with `CacheMiss` when no entry exists; a miss never creates
    /// one. A successful patch clears the errors half and refreshes the
    /// timestamp. An entry with no data hands `Value::Null` to the closure.
    pub fn patch(&self, key: &OperationKey, mutate: impl FnOnce(Value) -> Value) -> Result<()> {
        let mut entries = self.lock();
        let entry = entries.get_mut(key).ok_or(QuillError::CacheMiss)?;
        let current = entry.data.take().unwrap_or(Value::Null);
        entry.data = Some(mutate(current));
        entry.errors = None;
        entry.cached_at = Utc::now();
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<OperationKey, CacheEntry>> {
        self.entries.lock().expect("cache lock poisoned")
    }
}
