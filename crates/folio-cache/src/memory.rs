//! In-process cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Cache, CacheBucket};

type Entries = HashMap<String, (String, Vec<u8>)>;

/// Process-local [`Cache`]; contents vanish with the value.
///
/// Buckets opened with the same name share storage, so a clone of the
/// `MemoryCache` (or a second `bucket()` call) sees earlier writes.
#[derive(Clone, Default)]
pub struct MemoryCache {
    buckets: Arc<Mutex<HashMap<String, Arc<Mutex<Entries>>>>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = Arc::clone(buckets.entry(name.to_owned()).or_default());
        Box::new(MemoryBucket { entries })
    }
}

struct MemoryBucket {
    entries: Arc<Mutex<Entries>>,
}

impl CacheBucket for MemoryBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (stored_etag, value) = entries.get(key)?;
        (etag.is_empty() || stored_etag == etag).then(|| value.clone())
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), (etag.to_owned(), value.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bucket_overwrite_replaces_etag() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("scenes");

        bucket.set("key", "etag1", b"first");
        bucket.set("key", "etag2", b"second");

        assert_eq!(bucket.get("key", "etag1"), None);
        assert_eq!(bucket.get("key", "etag2"), Some(b"second".to_vec()));
        assert_eq!(bucket.get("key", ""), Some(b"second".to_vec()));
    }

    #[test]
    fn test_memory_buckets_share_storage_by_name() {
        let cache = MemoryCache::new();
        cache.bucket("scenes").set("k", "e", b"data");

        assert_eq!(cache.bucket("scenes").get("k", "e"), Some(b"data".to_vec()));
        assert_eq!(cache.bucket("other").get("k", "e"), None);
        assert_eq!(cache.clone().bucket("scenes").get("k", "e"), Some(b"data".to_vec()));
    }
}
