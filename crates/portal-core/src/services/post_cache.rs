//! Read-through cache of posts keyed by id.
//!
//! Every write path in [`PostService`](super::PostService) calls
//! [`PostCache::invalidate`] after the store accepted the change. A load that
//! overlaps such a write never leaves its copy behind: the write counter is
//! read before the load and checked again after the copy is stored.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::domain::Post;
use crate::error::RepoError;
use crate::ports::Cache;

pub struct PostCache {
    cache: Arc<dyn Cache>,
    ttl: Option<Duration>,
    /// Bumped by every invalidation.
    writes: AtomicU64,
}

impl PostCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Option<Duration>) -> Self {
        Self {
            cache,
            ttl,
            writes: AtomicU64::new(0),
        }
    }

    pub fn key(id: Uuid) -> String {
        format!("post-{}", id)
    }

    pub async fn get(&self, id: Uuid) -> Option<Post> {
        let raw = self.cache.get(&Self::key(id)).await?;
        match serde_json::from_str(&raw) {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::warn!(post_id = %id, error = %e, "Discarding unreadable cached post");
                self.remove(id).await;
                None
            }
        }
    }

    pub async fn put(&self, post: &Post) {
        let raw = match serde_json::to_string(post) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    post_id = %post.id,
                    error = %e,
                    "Failed to serialize post for cache"
                );
                return;
            }
        };
        if let Err(e) = self.cache.set(&Self::key(post.id), &raw, self.ttl).await {
            tracing::warn!(post_id = %post.id, error = %e, "Failed to cache post");
        }
    }

    /// Drop the cached copy after a write. Loads already in flight will not
    /// keep what they read.
    pub async fn invalidate(&self, id: Uuid) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.remove(id).await;
    }

    async fn remove(&self, id: Uuid) {
        if let Err(e) = self.cache.delete(&Self::key(id)).await {
            tracing::error!(post_id = %id, error = %e, "Failed to invalidate cached post");
        }
    }

    /// Return the cached post, or load it, cache it and return it.
    pub async fn get_or_load<F, Fut>(&self, id: Uuid, load: F) -> Result<Option<Post>, RepoError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Post>, RepoError>>,
    {
        if let Some(post) = self.get(id).await {
            return Ok(Some(post));
        }

        let seen = self.writes.load(Ordering::SeqCst);
        let loaded = load().await?;
        if let Some(post) = &loaded {
            self.put(post).await;
            // A write landed while loading; what was stored may predate it.
            if self.writes.load(Ordering::SeqCst) != seen {
                tracing::debug!(post_id = %id, "Write raced a cache fill, dropping the copy");
                self.remove(id).await;
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::PostKind;
    use crate::ports::CacheError;

    #[derive(Default)]
    struct MapCache(Mutex<HashMap<String, String>>);

    #[async_trait]
    impl Cache for MapCache {
        async fn get(&self, key: &str) -> Option<String> {
            self.0.lock().unwrap().get(key).cloned()
        }

        async fn set(
            &self,
            key: &str,
            value: &str,
            _ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            self.0.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.0.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn sample_post() -> Post {
        Post::new(
            Uuid::new_v4(),
            PostKind::News,
            "Title".into(),
            "Body".into(),
            vec![],
        )
    }

    #[tokio::test]
    async fn loads_once_then_serves_from_cache() {
        let cache = PostCache::new(Arc::new(MapCache::default()), None);
        let post = sample_post();

        let first = cache
            .get_or_load(post.id, || async { Ok(Some(post.clone())) })
            .await
            .unwrap();
        assert_eq!(first.as_ref(), Some(&post));

        let second = cache
            .get_or_load(post.id, || async { panic!("store must not be hit") })
            .await
            .unwrap();
        assert_eq!(second, Some(post));
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache = PostCache::new(Arc::new(MapCache::default()), None);
        let mut post = sample_post();
        cache.put(&post).await;

        post.title = "Edited".into();
        cache.invalidate(post.id).await;

        let reloaded = cache
            .get_or_load(post.id, || async { Ok(Some(post.clone())) })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.title, "Edited");
    }

    #[tokio::test]
    async fn write_during_slow_load_wins() {
        let cache = PostCache::new(Arc::new(MapCache::default()), None);
        let old = sample_post();
        let mut new = old.clone();
        new.title = "New".into();
        let (release, wait) = tokio::sync::oneshot::channel::<()>();

        let slow_read = cache.get_or_load(old.id, || async {
            wait.await.ok();
            Ok(Some(old.clone()))
        });
        let write = async {
            cache.invalidate(old.id).await;
            release.send(()).ok();
        };
        let (stale, ()) = tokio::join!(slow_read, write);
        assert_eq!(stale.unwrap().unwrap().title, "Title");

        let fresh = cache
            .get_or_load(new.id, || async { Ok(Some(new.clone())) })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.title, "New");
    }

    #[tokio::test]
    async fn missing_post_is_not_cached() {
        let cache = PostCache::new(Arc::new(MapCache::default()), None);
        let id = Uuid::new_v4();

        let loaded = cache.get_or_load(id, || async { Ok(None) }).await.unwrap();
        assert!(loaded.is_none());
        assert!(cache.get(id).await.is_none());
    }
}
