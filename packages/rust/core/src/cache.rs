//! Time-bounded cache of built knowledge buffers.
//!
//! Entries are keyed by (credential identity, folder id) and replaced
//! wholesale on refresh. Concurrent refreshes of the same key may both run;
//! the last one to finish wins.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use docchat_shared::Result;

use crate::knowledge::KnowledgeBuffer;

/// Identifies one knowledge buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Credential identity (never key material).
    pub identity: String,
    pub folder_id: String,
}

impl CacheKey {
    pub fn new(identity: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            folder_id: folder_id.into(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    buffer: Arc<KnowledgeBuffer>,
    built_at: Instant,
}

/// Shared knowledge cache with a fixed time-to-live.
#[derive(Debug)]
pub struct KnowledgeCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
}

impl KnowledgeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached buffer for `key`, if present and not expired.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<KnowledgeBuffer>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.built_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.buffer))
    }

    /// Return the fresh cached buffer, or run `build` and store its result.
    ///
    /// Failed builds are not cached and leave any previous entry in place.
    pub async fn get_or_build<F, Fut>(&self, key: &CacheKey, build: F) -> Result<Arc<KnowledgeBuffer>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<KnowledgeBuffer>>,
    {
        if let Some(buffer) = self.get(key).await {
            debug!(folder_id = %key.folder_id, "knowledge cache hit");
            return Ok(buffer);
        }

        debug!(folder_id = %key.folder_id, "knowledge cache miss");
        let buffer = Arc::new(build().await?);
        self.insert(key.clone(), Arc::clone(&buffer)).await;
        Ok(buffer)
    }

    /// Replace the entry for `key`.
    pub async fn insert(&self, key: CacheKey, buffer: Arc<KnowledgeBuffer>) {
        let entry = Arc::new(CacheEntry {
            buffer,
            built_at: Instant::now(),
        });
        self.entries.write().await.insert(key, entry);
    }

    /// Drop the entry for `key` so the next lookup rebuilds.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::aggregate;
    use docchat_shared::{DocChatError, ExtractedText};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn buffer(body: &str) -> KnowledgeBuffer {
        aggregate(&[ExtractedText::new("doc", body)])
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_skips_build() {
        let cache = KnowledgeCache::new(Duration::from_secs(600));
        let key = CacheKey::new("reader@x", "folder");
        let builds = AtomicUsize::new(0);

        for _ in 0..2 {
            let got = cache
                .get_or_build(&key, || async {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(buffer("v1"))
                })
                .await
                .unwrap();
            assert!(got.as_str().contains("v1"));
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_rebuilt_wholesale() {
        let cache = KnowledgeCache::new(Duration::ZERO);
        let key = CacheKey::new("reader@x", "folder");

        let first = cache.get_or_build(&key, || async { Ok(buffer("old")) }).await.unwrap();
        let second = cache.get_or_build(&key, || async { Ok(buffer("new")) }).await.unwrap();

        assert!(first.as_str().contains("old"));
        assert!(second.as_str().contains("new"));
        assert!(!second.as_str().contains("old"));
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let cache = KnowledgeCache::new(Duration::from_secs(600));
        cache
            .insert(CacheKey::new("a", "folder"), Arc::new(buffer("for a")))
            .await;

        assert!(cache.get(&CacheKey::new("a", "folder")).await.is_some());
        assert!(cache.get(&CacheKey::new("b", "folder")).await.is_none());
        assert!(cache.get(&CacheKey::new("a", "other")).await.is_none());
    }

    #[tokio::test]
    async fn failed_builds_are_not_cached() {
        let cache = KnowledgeCache::new(Duration::from_secs(600));
        let key = CacheKey::new("a", "folder");

        let err = cache
            .get_or_build(&key, || async {
                Err(DocChatError::NoDocumentsFound {
                    folder_id: "folder".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DocChatError::NoDocumentsFound { .. }));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let cache = KnowledgeCache::new(Duration::from_secs(600));
        let key = CacheKey::new("a", "folder");
        cache.insert(key.clone(), Arc::new(buffer("v1"))).await;
        cache.invalidate(&key).await;
        assert!(cache.get(&key).await.is_none());
    }
}
