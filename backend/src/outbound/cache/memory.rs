//! Process-local `TaskCache` with clock-driven expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{CacheKey, TaskCache, TaskCacheError};

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory cache. Expired entries are dropped when read and swept on every
/// write.
pub struct InMemoryTaskCache {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskCache {
    /// Create an empty cache measuring expiry against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Whether a live entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = self.clock.utc();
        self.lock()
            .map(|entries| {
                entries
                    .get(key.as_str())
                    .is_some_and(|entry| entry.expires_at > now)
            })
            .unwrap_or(false)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, TaskCacheError> {
        self.entries
            .lock()
            .map_err(|_| TaskCacheError::backend("in-memory cache lock poisoned"))
    }
}

#[async_trait]
impl TaskCache for InMemoryTaskCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, TaskCacheError> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        match entries.get(key.as_str()) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), TaskCacheError> {
        let now = self.clock.utc();
        let lifetime = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = now
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut entries = self.lock()?;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.as_str().to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), TaskCacheError> {
        self.lock()?.remove(key.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::test_support::onboarding::MutableClock;
    use rstest::rstest;

    fn key() -> CacheKey {
        CacheKey::tasks_for_user(UserId::new(42).expect("positive id"))
    }

    #[rstest]
    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let cache = InMemoryTaskCache::new(clock.clone());

        cache
            .set(&key(), "[]", Duration::from_secs(600))
            .await
            .expect("set succeeds");
        clock.advance(Duration::from_secs(599));
        assert_eq!(cache.get(&key()).await.expect("get"), Some("[]".to_owned()));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&key()).await.expect("get"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn set_overwrites_and_restarts_expiry() {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let cache = InMemoryTaskCache::new(clock.clone());

        cache.set(&key(), "old", Duration::from_secs(10)).await.expect("set");
        clock.advance(Duration::from_secs(8));
        cache.set(&key(), "new", Duration::from_secs(10)).await.expect("set");
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get(&key()).await.expect("get"), Some("new".to_owned()));
    }

    #[rstest]
    #[tokio::test]
    async fn write_sweeps_expired_entries_of_other_keys() {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let cache = InMemoryTaskCache::new(clock.clone());
        let other = CacheKey::tasks_for_user(UserId::new(7).expect("positive id"));

        cache.set(&other, "[]", Duration::from_secs(10)).await.expect("set");
        clock.advance(Duration::from_secs(11));
        cache.set(&key(), "[]", Duration::from_secs(10)).await.expect("set");

        let entries = cache.entries.lock().expect("lock");
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(key().as_str()));
    }

    #[rstest]
    #[tokio::test]
    async fn delete_of_absent_key_succeeds() {
        let cache = InMemoryTaskCache::new(Arc::new(MutableClock::new(Utc::now())));
        cache.delete(&key()).await.expect("delete succeeds");
        assert!(!cache.contains(&key()));
    }
}
