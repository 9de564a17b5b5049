//! File-based cache implementation.
//!
//! [`FileCache`] keeps one file per entry, grouped into one subdirectory per
//! bucket. An entry file starts with the etag on its own line, followed by the
//! raw value bytes:
//!
//! ```text
//! {etag}\n{data bytes}
//! ```
//!
//! Etags therefore must not contain a newline; [`FileCacheBucket::set`]
//! refuses to store such entries.
//!
//! A `VERSION` file in the cache root records the cache layout version. When
//! it is missing or different, the whole directory is wiped on construction.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use crate::{Cache, CacheBucket};

/// File-based [`Cache`] rooted at a directory on disk.
///
/// ```text
/// {root}/
/// +-- VERSION
/// +-- scenes/
///     +-- 5d41402abc4b2a76...
/// ```
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Open a file cache at `root`, wiping it when its `VERSION` differs from
    /// `version`. Filesystem problems are logged and never fatal; a cache
    /// that cannot be written simply misses.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        ensure_version(&root, version);
        Self { root }
    }

    /// Root directory of this cache.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Cache for FileCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(FileCacheBucket {
            dir: self.root.join(name),
        })
    }
}

struct FileCacheBucket {
    dir: PathBuf,
}

impl FileCacheBucket {
    /// Map a key to an entry path, rejecting keys that would escape the
    /// bucket directory.
    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.dir.join(relative))
    }
}

impl CacheBucket for FileCacheBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key)?;
        let mut reader = BufReader::new(File::open(path).ok()?);

        let mut header = Vec::new();
        reader.read_until(b'\n', &mut header).ok()?;
        if header.pop() != Some(b'\n') {
            return None;
        }
        if !etag.is_empty() && header != etag.as_bytes() {
            return None;
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).ok()?;
        Some(data)
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        if etag.contains('\n') {
            tracing::warn!(key, "refusing to cache entry with multi-line etag");
            return;
        }
        let Some(path) = self.entry_path(key) else {
            tracing::warn!(key, "refusing to cache entry with unsafe key");
            return;
        };
        if let Some(parent) = path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            tracing::debug!("cannot create cache bucket directory: {e}");
            return;
        }

        let mut buf = Vec::with_capacity(etag.len() + 1 + value.len());
        buf.extend_from_slice(etag.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(value);

        if let Err(e) = fs::write(&path, &buf) {
            tracing::debug!("cannot write cache entry {}: {e}", path.display());
        }
    }
}

/// Validate the cache version, wiping the directory on mismatch.
fn ensure_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!("cache version changed ({stored} -> {version}), wiping cache");
        }
        Err(_) => {
            tracing::info!("initializing cache at {}", root.display());
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write cache VERSION file: {e}");
    }
}
