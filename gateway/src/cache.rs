//! 应用层缓存客户端
//!
//! 包装 `CachePort`，所有失败都被记录并吞掉：读取视为未命中，写入返回 `false`

use lux_ports::CachePort;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 默认缓存时长（秒）
pub const DEFAULT_TTL_SECS: u64 = 300;

/// 容错缓存客户端
#[derive(Clone)]
pub struct CacheClient {
    port: Arc<dyn CachePort>,
}

impl CacheClient {
    pub fn new(port: Arc<dyn CachePort>) -> Self {
        Self { port }
    }

    pub fn is_configured(&self) -> bool {
        self.port.is_configured()
    }

    /// 读取并反序列化
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_configured() {
            return None;
        }

        let raw = match self.port.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Cache get failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Cached value could not be decoded");
                None
            }
        }
    }

    /// 序列化并写入，`ttl_secs` 为 0 时不过期
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        if !self.is_configured() {
            return true;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Cache value could not be encoded");
                return false;
            }
        };

        let ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs));
        match self.port.set(key, &raw, ttl).await {
            Ok(()) => {
                debug!(key, ttl = ttl_secs, "Cache value set");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Cache set failed");
                false
            }
        }
    }

    /// 读穿透：命中直接返回，未命中执行 `fetcher` 并回写
    ///
    /// 缓存本身出错时直接使用 `fetcher` 的结果
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl_secs: u64, fetcher: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.is_configured() {
            debug!(key, "Cache not configured, executing fetcher directly");
            return fetcher().await;
        }

        if let Some(hit) = self.get::<T>(key).await {
            debug!(key, "Cache hit");
            return hit;
        }

        debug!(key, "Cache miss, executing fetcher");
        let value = fetcher().await;
        self.set(key, &value, ttl_secs).await;
        value
    }

    /// 失效单个键，或在包含 `*` 时按模式失效
    pub async fn invalidate(&self, key_or_pattern: &str) {
        if !self.is_configured() {
            return;
        }

        if key_or_pattern.contains('*') {
            match self.port.delete_pattern(key_or_pattern).await {
                Ok(count) if count > 0 => {
                    info!(pattern = key_or_pattern, count, "Cache invalidated by pattern");
                }
                Ok(_) => {}
                Err(e) => warn!(pattern = key_or_pattern, error = %e, "Cache invalidation failed"),
            }
        } else {
            match self.port.delete(key_or_pattern).await {
                Ok(_) => debug!(key = key_or_pattern, "Cache key invalidated"),
                Err(e) => warn!(key = key_or_pattern, error = %e, "Cache invalidation failed"),
            }
        }
    }

    /// 递增计数器并设置过期时间，失败返回 `None`
    pub async fn increment_with_ttl(&self, key: &str, ttl_secs: u64) -> Option<i64> {
        if !self.is_configured() {
            return None;
        }

        match self
            .port
            .incr_and_expire(key, Duration::from_secs(ttl_secs))
            .await
        {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(key, error = %e, "Cache increment failed");
                None
            }
        }
    }
}

/// 业务缓存键
pub mod cache_keys {
    pub fn user(user_id: &str) -> String {
        format!("user:{}", user_id)
    }

    pub fn booking(booking_id: &str) -> String {
        format!("booking:{}", booking_id)
    }

    pub fn user_bookings(user_id: &str) -> String {
        format!("user:{}:bookings", user_id)
    }

    pub fn pricing(pickup: &str, destination: &str) -> String {
        format!("pricing:{}:{}", pickup, destination)
    }

    pub fn fleet() -> &'static str {
        "fleet:available"
    }

    pub fn rates() -> &'static str {
        "rates:current"
    }
}
