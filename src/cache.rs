//! Process-local TTL cache for aggregated read models (home page, admin dashboard).

use std::{
    any::Any,
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;
use tracing::debug;

pub const HOME_KEY: &str = "home:index:data";
pub const DASHBOARD_KEY: &str = "dashboard:data";
pub const POPULAR_RECIPES_KEY: &str = "dashboard:popular_recipes";
pub const RECENT_ACTIVITIES_KEY: &str = "dashboard:recent_activities";
pub const SYSTEM_HEALTH_KEY: &str = "dashboard:system_health";

pub fn user_growth_key(days: i64) -> String {
    format!("dashboard:user_growth:{days}")
}

struct Entry {
    expires_at: Instant,
    value: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the cached value when present, unexpired and of type `T`.
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(e) if e.expires_at > Instant::now() => {
                    return e.value.downcast_ref::<T>().cloned();
                }
                Some(_) => {}
                None => return None,
            }
        }
        // expired
        self.entries.write().await.remove(key);
        None
    }

    pub async fn insert<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let entry = Entry {
            expires_at: Instant::now() + ttl,
            value: Arc::new(value),
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    pub async fn remove(&self, key: &str) {
        if self.entries.write().await.remove(key).is_some() {
            debug!(key, "cache entry evicted");
        }
    }

    pub async fn remove_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .await
            .retain(|k, _| !k.starts_with(prefix));
    }

    /// Cache-aside: serve the cached value or compute, store and return a fresh one.
    /// Failures are not cached.
    pub async fn get_or_try_insert_with<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            debug!(key, "cache hit");
            return Ok(hit);
        }
        let value = load().await?;
        self.insert(key, value.clone(), ttl).await;
        Ok(value)
    }
}
