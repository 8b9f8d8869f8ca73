//! Cache trait 定义

use async_trait::async_trait;
use lux_errors::AppResult;
use std::time::Duration;

/// 缓存 trait
///
/// 所有操作都可能失败；是否吞掉错误由调用方决定
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait CachePort: Send + Sync {
    /// 是否连接了真实的缓存后端
    fn is_configured(&self) -> bool;

    /// 获取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 获取整数值（计数器）
    async fn get_int(&self, key: &str) -> AppResult<Option<i64>>;

    /// 设置缓存值，`ttl` 为 `None` 时不过期
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()>;

    /// 删除缓存，返回删除的键数量
    async fn delete(&self, key: &str) -> AppResult<u64>;

    /// 按 glob 模式删除，返回删除的键数量
    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64>;

    /// 在一次原子往返中递增计数器并重新设置过期时间
    /// 返回递增后的值
    async fn incr_and_expire(&self, key: &str, ttl: Duration) -> AppResult<i64>;

    /// 获取剩余 TTL（秒），`None` 表示键不存在或没有过期时间
    async fn ttl(&self, key: &str) -> AppResult<Option<i64>>;

    /// 连通性检查
    async fn ping(&self) -> AppResult<()>;
}

/// 未配置缓存时使用的空实现
///
/// 读取总是未命中，写入总是成功
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CachePort for NoopCache {
    fn is_configured(&self) -> bool {
        false
    }

    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn get_int(&self, _key: &str) -> AppResult<Option<i64>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<u64> {
        Ok(0)
    }

    async fn delete_pattern(&self, _pattern: &str) -> AppResult<u64> {
        Ok(0)
    }

    async fn incr_and_expire(&self, _key: &str, _ttl: Duration) -> AppResult<i64> {
        Ok(0)
    }

    async fn ttl(&self, _key: &str) -> AppResult<Option<i64>> {
        Ok(None)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
