//! Cache abstraction layer for Folio.
//!
//! Consumers (the scene memo, the CLI) talk to storage only through two
//! traits:
//!
//! - [`Cache`]: Factory for named cache buckets
//! - [`CacheBucket`]: Key-value store with etag-based validation
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: Process-local buckets backed by a `HashMap`
//! - [`FileCache`]: File-based implementation with version validation
//!
//! # Example
//!
//! ```
//! use folio_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let bucket = cache.bucket("scenes");
//! bucket.set("3f2a", "v1", b"{\"elements\":[]}");
//! assert_eq!(bucket.get("3f2a", "v1").as_deref(), Some(&b"{\"elements\":[]}"[..]));
//! assert_eq!(bucket.get("3f2a", "v2"), None);
//! ```

mod ext;
mod file;
mod memory;

pub use ext::CacheBucketExt;
pub use file::FileCache;
pub use memory::MemoryCache;

/// A named partition within a [`Cache`].
///
/// Values are stored under a key together with an etag. The etag is an opaque
/// string chosen by the caller (a format version, a content hash). A hit
/// requires both the key and the etag to match.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `None` on a miss or an etag mismatch. An empty `etag` skips
    /// validation and returns whatever is stored under `key`.
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Store a value, replacing any existing entry for `key`.
    fn set(&self, key: &str, etag: &str, value: &[u8]);
}

/// Factory for named cache [`CacheBucket`]s.
///
/// Buckets with different names never see each other's entries. Opening the
/// same name twice yields handles over the same storage.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket (e.g. `"scenes"`).
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// No-op [`CacheBucket`]: every `get` misses, every `set` is dropped.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _etag: &str, _value: &[u8]) {}
}

/// No-op [`Cache`] used when persistent caching is disabled.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}
