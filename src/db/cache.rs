use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};
use crate::models::Category;

/// Longest time an in-memory entry may live
const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Shortest sweep period accepted by [`MemoryCacheBackend::spawn_sweeper`]
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// External metadata for a title, per provider
    Enrichment {
        provider: &'static str,
        category: Category,
        title: String,
    },
    /// Generated explanation for an item under a given preference signature
    Explanation { content_id: String, signature: String },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Enrichment {
                provider,
                category,
                title,
            } => write!(
                f,
                "enrich:{}:{}:{}",
                provider,
                category,
                title.trim().to_lowercase()
            ),
            CacheKey::Explanation {
                content_id,
                signature,
            } => write!(f, "explain:{}:{}", content_id, signature),
        }
    }
}

/// Storage behind [`Cache`]
///
/// Reads may miss; writes are fire-and-forget and never surface errors to the caller.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    fn set(&self, key: String, value: String, ttl: Duration);

    fn name(&self) -> &'static str;
}

/// Typed cache handle shared by providers and explainers
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Cache backed by a process-local map (no sweeper attached)
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new()))
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` on a miss or an expired entry.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        match self.backend.get(&key.to_string()).await? {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Stores a value without waiting for the write to land
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        self.backend.set(key.to_string(), json, ttl);
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process TTL cache
///
/// Expired entries are invisible to readers immediately and physically removed
/// by [`MemoryCacheBackend::sweep`], which [`MemoryCacheBackend::spawn_sweeper`]
/// runs periodically.
#[derive(Default)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes expired entries, returning how many were evicted
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns the periodic eviction task
    ///
    /// A zero interval is raised to [`MIN_SWEEP_INTERVAL`].
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = self.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = self.len(), "Cache sweep completed");
                }
            }
        })
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Internal("cache lock poisoned".to_string()))?;

        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: String, value: String, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now);
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(
                    key,
                    MemoryEntry {
                        value,
                        expires_at,
                    },
                );
            }
            Err(_) => tracing::error!("Cache lock poisoned, dropping write"),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_key_display_enrichment_lowercases_title() {
        let key = CacheKey::Enrichment {
            provider: "jikan",
            category: Category::Anime,
            title: " Cowboy Bebop ".to_string(),
        };
        assert_eq!(format!("{}", key), "enrich:jikan:anime:cowboy bebop");
    }

    #[test]
    fn test_cache_key_display_explanation() {
        let key = CacheKey::Explanation {
            content_id: "a1".to_string(),
            signature: "action|intense".to_string(),
        };
        assert_eq!(format!("{}", key), "explain:a1:action|intense");
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = Cache::in_memory();
        let key = CacheKey::Explanation {
            content_id: "a1".to_string(),
            signature: "x".to_string(),
        };

        let missing: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(missing, None);

        cache.set_in_background(&key, &"hello".to_string(), Duration::from_secs(60));
        let found: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(found.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_memory_cache_expired_entry_is_a_miss() {
        let backend = MemoryCacheBackend::new();
        backend.set("k".to_string(), "v".to_string(), Duration::from_millis(0));

        assert_eq!(backend.get("k").await.unwrap(), None);
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.sweep(), 1);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_entries() {
        let backend = MemoryCacheBackend::new();
        backend.set("old".to_string(), "v".to_string(), Duration::from_millis(0));
        backend.set("new".to_string(), "v".to_string(), Duration::from_secs(60));

        assert_eq!(backend.sweep(), 1);
        assert_eq!(backend.get("new").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_sweeper_task_evicts_periodically() {
        let backend = Arc::new(MemoryCacheBackend::new());
        backend.set("k".to_string(), "v".to_string(), Duration::from_millis(1));

        let handle = backend.clone().spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.abort();

        assert!(backend.is_empty());
    }

    struct UnreachableBackend;

    #[async_trait::async_trait]
    impl CacheBackend for UnreachableBackend {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::Internal("backend unreachable".to_string()))
        }

        fn set(&self, _key: String, _value: String, _ttl: Duration) {}

        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    async fn lookup(cache: &Cache, calls: &AtomicUsize) -> AppResult<String> {
        let key = CacheKey::Explanation {
            content_id: "a1".to_string(),
            signature: "x".to_string(),
        };
        crate::cached!(cache, key, Duration::from_secs(60), async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<String, AppError>("fresh".to_string())
        })
    }

    #[tokio::test]
    async fn test_cached_read_failure_falls_through_to_source() {
        let cache = Cache::new(Arc::new(UnreachableBackend));
        let calls = AtomicUsize::new(0);

        assert_eq!(lookup(&cache, &calls).await.unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_hit_skips_source() {
        let cache = Cache::in_memory();
        let calls = AtomicUsize::new(0);

        lookup(&cache, &calls).await.unwrap();
        lookup(&cache, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_capped() {
        let backend = MemoryCacheBackend::new();
        backend.set("k".to_string(), "v".to_string(), Duration::MAX);

        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(backend.sweep(), 0);
    }

    #[tokio::test]
    async fn test_zero_sweep_interval_still_sweeps() {
        let backend = Arc::new(MemoryCacheBackend::new());
        backend.set("k".to_string(), "v".to_string(), Duration::from_millis(0));

        let handle = backend.clone().spawn_sweeper(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());
        handle.abort();

        assert!(backend.is_empty());
    }
}
