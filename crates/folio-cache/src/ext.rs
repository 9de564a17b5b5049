//! Typed access on top of raw byte buckets.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Typed convenience methods for any [`CacheBucket`].
///
/// Kept as an extension trait so [`CacheBucket`] itself stays object-safe and
/// serde-free; implementors only ever deal with bytes.
///
/// # Example
///
/// ```
/// use folio_cache::{Cache, CacheBucketExt, MemoryCache};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Summary { elements: usize }
///
/// let cache = MemoryCache::new();
/// let bucket = cache.bucket("scenes");
/// bucket.set_json("abc", "v1", &Summary { elements: 3 });
/// assert_eq!(bucket.get_json::<Summary>("abc", "v1"), Some(Summary { elements: 3 }));
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve and deserialize a JSON value.
    ///
    /// A stored value that no longer deserializes counts as a miss.
    fn get_json<T: DeserializeOwned>(&self, key: &str, etag: &str) -> Option<T> {
        let bytes = self.get(key, etag)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, "discarding undecodable cache entry: {e}");
                None
            }
        }
    }

    /// Serialize a value as JSON and store it. Serialization failures are
    /// dropped, the cache being optional.
    fn set_json<T: Serialize>(&self, key: &str, etag: &str, value: &T) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.set(key, etag, &bytes);
        }
    }

    /// Retrieve a cached UTF-8 string.
    fn get_string(&self, key: &str, etag: &str) -> Option<String> {
        String::from_utf8(self.get(key, etag)?).ok()
    }

    /// Store a string value.
    fn set_string(&self, key: &str, etag: &str, value: &str) {
        self.set(key, etag, value.as_bytes());
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cache, MemoryCache};

    #[test]
    fn test_string_roundtrip_respects_etag() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("svg");
        bucket.set_string("k", "v1", "<svg/>");

        assert_eq!(bucket.get_string("k", "v1").as_deref(), Some("<svg/>"));
        assert_eq!(bucket.get_string("k", "v2"), None);
    }

    #[test]
    fn test_get_json_treats_garbage_as_miss() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("scenes");
        bucket.set("k", "v1", b"not json");

        assert_eq!(bucket.get_json::<Vec<u32>>("k", "v1"), None);
    }
}
