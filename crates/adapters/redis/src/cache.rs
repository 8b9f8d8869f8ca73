//! Redis Cache 实现

use async_trait::async_trait;
use lux_errors::{AppError, AppResult};
use lux_ports::CachePort;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::debug;

use crate::connection::check_connection;

/// 批量删除时每条 DEL 携带的键数量
const DELETE_BATCH_SIZE: usize = 500;

/// Redis Cache
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// 连接到指定 URL
    pub async fn connect(url: &str) -> AppResult<Self> {
        let conn = crate::connection::create_connection_manager(url).await?;
        Ok(Self::new(conn))
    }
}

fn cache_err(op: &str, e: redis::RedisError) -> AppError {
    AppError::cache(format!("Redis {} failed: {}", op, e))
}

#[async_trait]
impl CachePort for RedisCache {
    fn is_configured(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| cache_err("get", e))
    }

    async fn get_int(&self, key: &str) -> AppResult<Option<i64>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| cache_err("get_int", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(duration) => conn
                .set_ex(key, value, duration.as_secs().max(1))
                .await
                .map_err(|e| cache_err("set", e)),
            None => conn.set(key, value).await.map_err(|e| cache_err("set", e)),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<u64> {
        let mut conn = self.conn.clone();
        conn.del(key).await.map_err(|e| cache_err("delete", e))
    }

    async fn delete_pattern(&self, pattern: &str) -> AppResult<u64> {
        let mut conn = self.conn.clone();

        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| cache_err("keys", e))?;

        let mut deleted = 0u64;
        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let n: u64 = conn
                .del(chunk)
                .await
                .map_err(|e| cache_err("delete_pattern", e))?;
            deleted += n;
        }

        debug!(pattern, matched = keys.len(), deleted, "Deleted keys by pattern");
        Ok(deleted)
    }

    async fn incr_and_expire(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        let mut conn = self.conn.clone();

        // MULTI/EXEC 保证 INCR 与 EXPIRE 一起生效
        let (count, _): (i64, i64) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, ttl.as_secs().max(1) as i64)
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_err("incr_and_expire", e))?;

        Ok(count)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<i64>> {
        let mut conn = self.conn.clone();
        let ttl: i64 = conn.ttl(key).await.map_err(|e| cache_err("ttl", e))?;

        // -2 表示键不存在，-1 表示没有过期时间
        match ttl {
            -2 | -1 => Ok(None),
            t => Ok(Some(t)),
        }
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        check_connection(&mut conn).await
    }
}
