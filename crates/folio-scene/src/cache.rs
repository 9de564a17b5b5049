//! Scene memo keyed by source identity.
//!
//! Sources are immutable, so a decoded scene never goes stale: the memo has no
//! invalidation. Each key owns one [`OnceLock`] slot and every caller asking
//! for that key waits on the same slot, which collapses concurrent requests
//! into a single decode.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use folio_cache::{CacheBucket, CacheBucketExt};
use sha2::{Digest, Sha256};

use crate::consts::SCENE_CACHE_VERSION;
use crate::decode::decode;
use crate::error::DecodeError;
use crate::model::Scene;

/// Content hash identifying a scene source.
///
/// SHA-256 of the raw payload, hex encoded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneKey(String);

impl SceneKey {
    #[must_use]
    pub fn of(source: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of decoding one source, shared by every reader.
pub type SceneResult = Result<Arc<Scene>, DecodeError>;

type Slot = Arc<OnceLock<SceneResult>>;

/// Memo of decoded scenes for one application or session.
///
/// Create one per context and share it behind an [`Arc`]. An optional
/// persistent [`CacheBucket`] keeps successful decodes across processes.
///
/// # Example
///
/// ```
/// use folio_scene::SceneCache;
///
/// let cache = SceneCache::new();
/// let raw = r#"{"elements":[{"id":"a","type":"rectangle"}]}"#;
/// let first = cache.get_or_decode(raw).unwrap();
/// let second = cache.get_or_decode(raw).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.decode_count(), 1);
/// ```
#[derive(Default)]
pub struct SceneCache {
    slots: Mutex<HashMap<SceneKey, Slot>>,
    persistent: Option<Box<dyn CacheBucket>>,
    decodes: AtomicUsize,
}

impl SceneCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Back the memo with a persistent bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: Box<dyn CacheBucket>) -> Self {
        self.persistent = Some(bucket);
        self
    }

    /// Decoded scene for `raw`, decoding at most once per distinct source.
    ///
    /// Callers racing on the same uncached source block until the single
    /// in-flight decode finishes and then share its result.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] of the (memoized) failed decode.
    pub fn get_or_decode(&self, raw: &str) -> SceneResult {
        let key = SceneKey::of(raw);
        let slot = self.slot(&key);
        slot.get_or_init(|| self.load(&key, raw)).clone()
    }

    /// Completed result for `key`, if any. Never blocks on an in-flight
    /// decode.
    #[must_use]
    pub fn get(&self, key: &SceneKey) -> Option<SceneResult> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key)?.get().cloned()
    }

    /// Start decoding `raw` on the rayon pool and return its key right away.
    ///
    /// The decode runs to completion even if nobody ever reads the result;
    /// later callers find it in the memo.
    pub fn prefetch(self: &Arc<Self>, raw: impl Into<String>) -> SceneKey {
        let raw = raw.into();
        let key = SceneKey::of(&raw);
        let cache = Arc::clone(self);
        rayon::spawn(move || {
            let _ = cache.get_or_decode(&raw);
        });
        key
    }

    /// Number of decodes actually run (persistent hits excluded).
    #[must_use]
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }

    /// Number of sources seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &SceneKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn load(&self, key: &SceneKey, raw: &str) -> SceneResult {
        if let Some(bucket) = &self.persistent
            && let Some(scene) = bucket.get_json::<Scene>(key.as_str(), SCENE_CACHE_VERSION)
        {
            tracing::debug!(%key, "scene served from persistent cache");
            return Ok(Arc::new(scene));
        }

        self.decodes.fetch_add(1, Ordering::Relaxed);
        let scene = decode(raw)?;
        if let Some(bucket) = &self.persistent {
            bucket.set_json(key.as_str(), SCENE_CACHE_VERSION, &scene);
        }
        Ok(Arc::new(scene))
    }
}
