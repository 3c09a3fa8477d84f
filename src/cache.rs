//! Caller-owned cache of resolved repository roots.
//!
//! Resolving a root shells out to the VCS, so callers that resolve the same
//! directory repeatedly keep a [`RootCache`] around. The cache is bounded and
//! keyed by the canonical absolute path plus the requested [`VcsKind`]; there
//! is no process-wide memoization.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::vcs::{self, VcsKind};

/// Default number of entries kept by [`RootCache::new`].
pub const DEFAULT_CAPACITY: usize = 16;

/// Cache key combining the canonical path and the backend selection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub kind: VcsKind,
}

impl CacheKey {
    /// Build a key, canonicalizing `path` when it exists.
    pub fn new(path: &Path, kind: VcsKind) -> Self {
        let path = path
            .canonicalize()
            .unwrap_or_else(|_| std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()));
        Self { path, kind }
    }
}

/// Bounded cache of repository roots, evicting the oldest insertion first.
#[derive(Debug, Clone)]
pub struct RootCache {
    capacity: usize,
    entries: HashMap<CacheKey, PathBuf>,
    order: VecDeque<CacheKey>,
}

impl RootCache {
    /// Create a cache holding up to [`DEFAULT_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cache holding up to `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Resolve the repository root for `path`, using the cache when possible.
    pub fn resolve(&mut self, path: &Path, kind: VcsKind) -> Result<PathBuf> {
        self.get_or_resolve(CacheKey::new(path, kind), |key| {
            vcs::backend(key.kind, &key.path)?.root_dir(&key.path)
        })
    }

    /// Get a cached root, or compute and cache it if not present
    pub fn get_or_resolve<F>(&mut self, key: CacheKey, resolver: F) -> Result<PathBuf>
    where
        F: FnOnce(&CacheKey) -> Result<PathBuf>,
    {
        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.clone());
        }

        // Failures are not cached
        let root = resolver(&key)?;
        self.insert(key, root.clone());
        Ok(root)
    }

    /// Manually insert a value into the cache
    pub fn insert(&mut self, key: CacheKey, root: PathBuf) {
        if self.entries.insert(key.clone(), root).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// Get a value from cache without computing
    pub fn get(&self, key: &CacheKey) -> Option<&PathBuf> {
        self.entries.get(key)
    }

    /// Clear all cached entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RootCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::git::test_support::init_repo;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn key(name: &str) -> CacheKey {
        CacheKey {
            path: PathBuf::from(format!("/repos/{}", name)),
            kind: VcsKind::Git,
        }
    }

    #[test]
    fn test_cache_key_distinguishes_kind() {
        let temp = TempDir::new().unwrap();
        let git = CacheKey::new(temp.path(), VcsKind::Git);
        let jj = CacheKey::new(temp.path(), VcsKind::Jujutsu);
        assert_ne!(git, jj);
        assert_eq!(git, CacheKey::new(temp.path(), VcsKind::Git));
    }

    #[test]
    fn test_get_or_resolve_caches_result() {
        let mut cache = RootCache::new();
        let calls = Cell::new(0);

        let first = cache
            .get_or_resolve(key("a"), |_| {
                calls.set(calls.get() + 1);
                Ok(PathBuf::from("/repos"))
            })
            .unwrap();
        let second = cache
            .get_or_resolve(key("a"), |_| {
                calls.set(calls.get() + 1);
                Ok(PathBuf::from("/elsewhere"))
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let mut cache = RootCache::new();
        let result = cache.get_or_resolve(key("a"), |k| {
            Err(Error::NotARepository {
                vcs: "git".to_string(),
                path: k.path.clone(),
            })
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = RootCache::with_capacity(2);
        cache.insert(key("a"), PathBuf::from("/a"));
        cache.insert(key("b"), PathBuf::from("/b"));
        cache.insert(key("c"), PathBuf::from("/c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.get(&key("c")), Some(&PathBuf::from("/c")));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = RootCache::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = RootCache::default();
        cache.insert(key("a"), PathBuf::from("/a"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_resolve_real_git_repository() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let nested = temp.path().join("sub");
        std::fs::create_dir_all(&nested).unwrap();

        let mut cache = RootCache::new();
        let root = cache.resolve(&nested, VcsKind::Git).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
        assert_eq!(cache.len(), 1);
    }
}
