//! 进程内 Cache 实现

use async_trait::async_trait;
use lux_errors::{AppError, AppResult};
use lux_ports::CachePort;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 进程内缓存
///
/// 过期基于 `tokio::time::Instant`，测试中可以暂停并推进时间
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前未过期的键数量
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }
}

/// 将 Redis 风格的 glob 模式转换为正则（支持 `*` 和 `?`）
fn glob_to_regex(pattern: &str) -> AppResult<Regex> {
    let mut re = String::with_capacity(pattern.len() + 2);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|e| AppError::cache(format!("Invalid key pattern: {}", e)))
}

#[async_trait]
impl CachePort for InMemoryCache {
    fn is_configured(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn get_int(&self, key: &str) -> AppResult<Option<i64>> {
        match self.live_value(key) {
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|e| AppError::cache(format!("Value is not an integer: {}", e))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<u64> {
        let now = Instant::now();
        let removed = self.entries.lock().remove(key);
        Ok(removed.is_some_and(|e| !e.is_expired(now)) as u64)
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();

        let mut deleted = 0u64;
        self.entries.lock().retain(|key, entry| {
            if !matcher.is_match(key) {
                return true;
            }
            if !entry.is_expired(now) {
                deleted += 1;
            }
            false
        });
        Ok(deleted)
    }

    async fn incr_and_expire(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let current = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => entry
                .value
                .parse::<i64>()
                .map_err(|e| AppError::cache(format!("Value is not an integer: {}", e)))?,
            _ => 0,
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| AppError::cache("Increment or decrement would overflow"))?;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(next)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<i64>> {
        let now = Instant::now();
        let entries = self.entries.lock();
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now).as_secs() as i64))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();
        cache.set("user:1", "{\"id\":\"1\"}", None).await.unwrap();

        assert_eq!(
            cache.get("user:1").await.unwrap().as_deref(),
            Some("{\"id\":\"1\"}")
        );
        assert_eq!(cache.get("user:2").await.unwrap(), None);
        assert_eq!(cache.ttl("user:1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let cache = InMemoryCache::new();
        cache
            .set("pricing:abc", "42", Some(Duration::from_secs(10)))
            .await
            .unwrap();
        assert_eq!(cache.ttl("pricing:abc").await.unwrap(), Some(10));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("pricing:abc").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_and_expire_rearms_window() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(cache.incr_and_expire("k", ttl).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.incr_and_expire("k", ttl).await.unwrap(), 2);

        // 每次递增都会重新设置过期时间
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(cache.get_int("k").await.unwrap(), Some(2));

        tokio::time::advance(Duration::from_secs(16)).await;
        assert_eq!(cache.get_int("k").await.unwrap(), None);
        assert_eq!(cache.incr_and_expire("k", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_overflow_is_error() {
        let cache = InMemoryCache::new();
        let max = i64::MAX.to_string();
        cache.set("counter", &max, None).await.unwrap();

        let result = cache.incr_and_expire("counter", Duration::from_secs(60)).await;
        assert!(matches!(result, Err(AppError::Cache(_))));
        assert_eq!(cache.get_int("counter").await.unwrap(), Some(i64::MAX));
    }

    #[tokio::test]
    async fn test_get_int_rejects_non_numeric() {
        let cache = InMemoryCache::new();
        cache.set("k", "abc", None).await.unwrap();
        assert!(cache.get_int("k").await.is_err());
        assert!(cache.incr_and_expire("k", Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = InMemoryCache::new();
        cache.set("booking:1", "a", None).await.unwrap();
        cache.set("booking:2", "b", None).await.unwrap();
        cache.set("user:bookings:7", "c", None).await.unwrap();
        cache.set("booking.3", "d", None).await.unwrap();

        assert_eq!(cache.delete_pattern("booking:*").await.unwrap(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("booking.3").await.unwrap().as_deref(), Some("d"));
    }

    #[tokio::test]
    async fn test_delete_single_key() {
        let cache = InMemoryCache::new();
        cache.set("fleet:available", "[]", None).await.unwrap();
        assert_eq!(cache.delete("fleet:available").await.unwrap(), 1);
        assert_eq!(cache.delete("fleet:available").await.unwrap(), 0);
    }

    #[test]
    fn test_glob_to_regex_escapes_metacharacters() {
        let re = glob_to_regex("rates.current?").unwrap();
        assert!(re.is_match("rates.current1"));
        assert!(!re.is_match("ratesXcurrent1"));
    }
}
