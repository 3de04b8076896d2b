//! File Chunk Cache Module
//!
//! Caches byte ranges of log files keyed by (path, offset, length) so that
//! chunked readers serving many viewers do not re-read overlapping ranges.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::{BoundedCache, CacheStats, SizeEstimate};

// == Cached File Chunk ==
/// Stored wrapper for one byte range.
#[derive(Debug, Clone)]
pub struct CachedFileChunk {
    pub bytes: Bytes,
    pub expires_at: Instant,
    pub file_path: PathBuf,
    pub offset: u64,
    /// Requested length; `bytes` may be shorter at end of file
    pub length: usize,
}

impl CachedFileChunk {
    /// True when this chunk holds exactly the requested range of `path`.
    pub fn covers(&self, path: &Path, offset: u64, length: usize) -> bool {
        self.offset == offset && self.length == length && self.file_path.as_path() == path
    }
}

impl SizeEstimate for CachedFileChunk {
    fn estimated_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Cache key for a byte range of a file.
///
/// The path is hashed from its raw bytes, so paths that are not valid UTF-8
/// never collide.
pub fn chunk_key(path: &Path, offset: u64, length: usize) -> String {
    let digest = Sha256::digest(path.as_os_str().as_encoded_bytes());
    format!("chunk:{:x}:{}:{}", digest, offset, length)
}

// == File Chunk Cache ==
/// Byte-range cache over an injected [`BoundedCache`].
///
/// Chunks above `max_chunk_size` are never cached. Invalidation is precise:
/// only chunks of the named file are dropped.
#[derive(Debug, Clone)]
pub struct FileChunkCache {
    cache: Arc<BoundedCache<CachedFileChunk>>,
    ttl: Duration,
    max_chunk_size: usize,
}

impl FileChunkCache {
    pub fn new(cache: Arc<BoundedCache<CachedFileChunk>>, ttl: Duration, max_chunk_size: usize) -> Self {
        Self {
            cache,
            ttl,
            max_chunk_size,
        }
    }

    // == Get Chunk ==
    /// Returns the cached bytes for the range unless missing or expired.
    ///
    /// A stored chunk past its own expiry, or for a different range, is
    /// dropped and counted as a miss.
    pub fn get_chunk(&self, path: &Path, offset: u64, length: usize) -> Option<Bytes> {
        let now = Instant::now();
        self.cache
            .get_valid(&chunk_key(path, offset, length), |cached| {
                now < cached.expires_at && cached.covers(path, offset, length)
            })
            .map(|cached| cached.bytes)
    }

    // == Set Chunk ==
    /// Caches `bytes` as the content of the requested range.
    ///
    /// `length` is the requested length; `bytes` may be shorter at end of file.
    pub fn set_chunk(&self, path: &Path, offset: u64, length: usize, bytes: Bytes) {
        if bytes.len() > self.max_chunk_size {
            debug!(
                "Not caching {} byte chunk of {}: above {} byte ceiling",
                bytes.len(),
                path.display(),
                self.max_chunk_size
            );
            return;
        }

        let cached = CachedFileChunk {
            bytes,
            expires_at: Instant::now() + self.ttl,
            file_path: path.to_path_buf(),
            offset,
            length,
        };
        self.cache.set(chunk_key(path, offset, length), cached);
    }

    // == Load Chunk ==
    /// Returns the range from cache, reading it from disk on a miss.
    ///
    /// Reads stop early at end of file.
    pub fn load_chunk(&self, path: &Path, offset: u64, length: usize) -> io::Result<Bytes> {
        if let Some(bytes) = self.get_chunk(path, offset, length) {
            return Ok(bytes);
        }

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(length.min(self.max_chunk_size));
        file.take(length as u64).read_to_end(&mut buf)?;

        let bytes = Bytes::from(buf);
        self.set_chunk(path, offset, length, bytes.clone());
        Ok(bytes)
    }

    // == Invalidate File ==
    /// Drops every cached chunk of `path`; returns how many.
    pub fn invalidate_file(&self, path: &Path) -> usize {
        let removed = self.cache.remove_where(|_, cached| cached.file_path.as_path() == path);
        if removed > 0 {
            debug!("Invalidated {} chunks of {}", removed, path.display());
        }
        removed
    }

    /// Removes every entry of the underlying cache.
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Arc<BoundedCache<CachedFileChunk>> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use std::io::Write;
    use std::thread::sleep;
    use tempfile::NamedTempFile;

    fn chunk_cache(ttl: Duration, max_chunk_size: usize) -> FileChunkCache {
        let storage = Arc::new(BoundedCache::new(
            CacheConfig::new(100, Duration::from_secs(300)).with_max_memory(1024 * 1024),
        ));
        FileChunkCache::new(storage, ttl, max_chunk_size)
    }

    #[test]
    fn test_chunk_key_distinguishes_ranges() {
        let path = Path::new("/var/log/app.log");
        assert_ne!(chunk_key(path, 0, 100), chunk_key(path, 0, 200));
        assert_ne!(chunk_key(path, 0, 100), chunk_key(path, 100, 100));
    }

    #[test]
    fn test_set_and_get_chunk() {
        let cache = chunk_cache(Duration::from_secs(60), 1024);
        let path = Path::new("/var/log/app.log");

        cache.set_chunk(path, 0, 5, Bytes::from_static(b"hello"));

        assert_eq!(cache.get_chunk(path, 0, 5), Some(Bytes::from_static(b"hello")));
        assert_eq!(cache.get_chunk(path, 0, 6), None);
    }

    #[test]
    fn test_oversized_chunk_not_cached() {
        let cache = chunk_cache(Duration::from_secs(60), 4);
        let path = Path::new("/var/log/app.log");

        cache.set_chunk(path, 0, 5, Bytes::from_static(b"hello"));

        assert_eq!(cache.get_chunk(path, 0, 5), None);
        assert!(cache.storage().is_empty());
    }

    #[test]
    fn test_chunk_expiry() {
        let cache = chunk_cache(Duration::from_millis(30), 1024);
        let path = Path::new("/var/log/app.log");

        cache.set_chunk(path, 0, 5, Bytes::from_static(b"hello"));
        sleep(Duration::from_millis(60));

        assert_eq!(cache.get_chunk(path, 0, 5), None);
        assert!(cache.storage().is_empty());
    }

    #[test]
    fn test_invalidate_file_is_precise() {
        let cache = chunk_cache(Duration::from_secs(60), 1024);
        let app = Path::new("/var/log/app.log");
        let sys = Path::new("/var/log/sys.log");

        cache.set_chunk(app, 0, 3, Bytes::from_static(b"abc"));
        cache.set_chunk(app, 3, 3, Bytes::from_static(b"def"));
        cache.set_chunk(sys, 0, 3, Bytes::from_static(b"xyz"));

        assert_eq!(cache.invalidate_file(app), 2);
        assert_eq!(cache.get_chunk(app, 0, 3), None);
        assert!(cache.get_chunk(sys, 0, 3).is_some());
    }

    #[test]
    fn test_load_chunk_reads_through() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"line one\nline two\n").unwrap();
        let cache = chunk_cache(Duration::from_secs(60), 1024);

        let first = cache.load_chunk(file.path(), 5, 3).unwrap();
        assert_eq!(&first[..], b"one");

        // Served from cache even after the file changes underneath
        file.as_file_mut().set_len(0).unwrap();
        let second = cache.load_chunk(file.path(), 5, 3).unwrap();
        assert_eq!(&second[..], b"one");
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_load_chunk_short_at_eof() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"tail").unwrap();
        let cache = chunk_cache(Duration::from_secs(60), 1024);

        let bytes = cache.load_chunk(file.path(), 2, 100).unwrap();
        assert_eq!(&bytes[..], b"il");
    }

    #[test]
    fn test_load_chunk_missing_file() {
        let cache = chunk_cache(Duration::from_secs(60), 1024);
        let result = cache.load_chunk(Path::new("/nonexistent/logscope/app.log"), 0, 10);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_do_not_share_chunks() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let cache = chunk_cache(Duration::from_secs(60), 1024);
        let first = Path::new(OsStr::from_bytes(b"/var/log/\xffa.log"));
        let second = Path::new(OsStr::from_bytes(b"/var/log/\xfea.log"));

        cache.set_chunk(first, 0, 6, Bytes::from_static(b"SECRET"));

        assert_ne!(chunk_key(first, 0, 6), chunk_key(second, 0, 6));
        assert_eq!(cache.get_chunk(second, 0, 6), None);
        assert_eq!(cache.invalidate_file(second), 0);
        assert_eq!(cache.get_chunk(first, 0, 6), Some(Bytes::from_static(b"SECRET")));
    }

    #[test]
    fn test_chunk_for_other_range_is_rejected() {
        let cache = chunk_cache(Duration::from_secs(60), 1024);
        let path = Path::new("/var/log/app.log");

        // Stored under the key of (0, 6) but describing another file
        cache.storage().set(
            chunk_key(path, 0, 6),
            CachedFileChunk {
                bytes: Bytes::from_static(b"SECRET"),
                expires_at: Instant::now() + Duration::from_secs(60),
                file_path: PathBuf::from("/var/log/sys.log"),
                offset: 0,
                length: 6,
            },
        );

        assert_eq!(cache.get_chunk(path, 0, 6), None);
        assert!(cache.storage().is_empty());
    }

    #[test]
    fn test_expired_chunk_is_not_a_hit() {
        let cache = chunk_cache(Duration::from_millis(30), 1024);
        let path = Path::new("/var/log/app.log");

        cache.set_chunk(path, 0, 5, Bytes::from_static(b"hello"));
        sleep(Duration::from_millis(60));
        assert_eq!(cache.get_chunk(path, 0, 5), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }
}
