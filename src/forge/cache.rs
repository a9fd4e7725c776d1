//! Process-lifetime response cache.
//!
//! Forge reads are memoised for the duration of one run, keyed by the
//! operation name and every argument that influences the result. This is
//! what makes repeated lookups inside a single scan cheap and keeps the
//! number of API calls predictable. Entries never expire; callers that need
//! fresh state either bypass the cache for one call or clear it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// Deterministic key for one logical forge request.
///
/// Keys are the compact JSON rendering of `[operation, arguments]`, so two
/// calls with the same operation and the same ordered arguments always share
/// an entry.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use vigil::forge::cache::CacheKey;
///
/// let first = CacheKey::new("reviews", json!(["octo", "cat", 7]));
/// let second = CacheKey::new("reviews", json!(["octo", "cat", 7]));
/// assert_eq!(first, second);
/// assert_eq!(first.as_str(), r#"["reviews",["octo","cat",7]]"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key from an operation name and its ordered arguments.
    #[must_use]
    pub fn new(operation: &str, arguments: Value) -> Self {
        Self(Value::Array(vec![Value::from(operation), arguments]).to_string())
    }

    /// Borrow the serialised key.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Key/value store for forge responses.
pub trait ResponseCache: Send + Sync {
    /// Returns the cached value for `key`, if any.
    fn get(&self, key: &CacheKey) -> Option<Value>;

    /// Stores `value` under `key` and hands the value back to the caller.
    fn set(&self, key: CacheKey, value: Value) -> Value;

    /// Drops every entry.
    fn clear(&self);
}

/// [`ResponseCache`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryResponseCache {
    entries: Mutex<HashMap<CacheKey, Value>>,
}

impl InMemoryResponseCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written entry.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: CacheKey, value: Value) -> Value {
        self.lock().insert(key, value.clone());
        value
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
