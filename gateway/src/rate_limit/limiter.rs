//! 限流器
//!
//! 固定窗口计数：先读计数，未超限时以 INCR+EXPIRE 原子管道递增。
//! 读与递增之间存在竞争，并发请求可能短暂超出配额。

use crate::rate_limit::identifier::client_identifier;
use crate::rate_limit::tier::UserTier;
use crate::rate_limit::types::{RateLimitResult, RateLimitRule, RateLimitStatus};
use axum::http::HeaderMap;
use lux_common::unix_timestamp;
use lux_errors::AppResult;
use lux_ports::CachePort;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 默认键前缀
pub const DEFAULT_KEY_PREFIX: &str = "ratelimit";

/// 当前 Unix 时间（秒）的来源
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// 限流器
#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn CachePort>,
    key_prefix: String,
    clock: Clock,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn CachePort>) -> Self {
        Self::with_prefix(cache, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(cache: Arc<dyn CachePort>, key_prefix: impl Into<String>) -> Self {
        Self {
            cache,
            key_prefix: key_prefix.into(),
            clock: Arc::new(unix_timestamp),
        }
    }

    /// 替换时间来源，`reset` 按该时钟计算
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// 计数器键：`{prefix}:{identifier}:{path}`
    pub fn key(&self, identifier: &str, path: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, identifier, path)
    }

    /// 检查并消耗一次配额
    ///
    /// 缓存未配置或出错时放行（fail-open）
    pub async fn check(&self, identifier: &str, path: &str, rule: &RateLimitRule) -> RateLimitResult {
        if !self.cache.is_configured() {
            warn!(identifier, path, "Rate limiting skipped - cache not configured");
            record_decision("skipped");
            return RateLimitResult::pass_through(rule);
        }

        let key = self.key(identifier, path);
        match self.check_counter(&key, rule).await {
            Ok(result) => {
                if result.allowed {
                    debug!(
                        identifier,
                        path,
                        current = result.current + 1,
                        remaining = result.remaining,
                        limit = result.limit,
                        "Rate limit check passed"
                    );
                    record_decision("allowed");
                } else {
                    warn!(
                        identifier,
                        path,
                        current = result.current,
                        limit = result.limit,
                        "Rate limit exceeded"
                    );
                    record_decision("rejected");
                }
                result
            }
            Err(e) => {
                error!(
                    identifier,
                    path,
                    error = %e,
                    "Rate limiting failed, allowing request (fail-open)"
                );
                record_decision("fail_open");
                RateLimitResult::pass_through(rule)
            }
        }
    }

    async fn check_counter(&self, key: &str, rule: &RateLimitRule) -> AppResult<RateLimitResult> {
        let current = self.cache.get_int(key).await?.unwrap_or(0).max(0) as u64;
        // reset 为本次检查时刻加窗口长度，而非窗口起点
        let reset = (self.clock)() + rule.window_secs();

        if current >= rule.max_requests() {
            return Ok(RateLimitResult::rejected(rule, current, reset));
        }

        // 每次放行都会重新设置过期时间
        self.cache.incr_and_expire(key, rule.window()).await?;

        Ok(RateLimitResult::admitted(rule, current, reset))
    }

    /// 按请求检查；显式标识优先于代理头
    pub async fn check_request(
        &self,
        headers: &HeaderMap,
        path: &str,
        rule: &RateLimitRule,
        identifier: Option<&str>,
    ) -> RateLimitResult {
        let identifier = match identifier {
            Some(id) => id.to_string(),
            None => client_identifier(headers),
        };
        self.check(&identifier, path, rule).await
    }

    /// 按用户等级检查，未知等级按 Bronze 处理
    pub async fn check_tier(&self, tier: &str, user_id: &str, path: &str) -> RateLimitResult {
        self.check_user(UserTier::from_name(tier), user_id, path)
            .await
    }

    pub async fn check_user(&self, tier: UserTier, user_id: &str, path: &str) -> RateLimitResult {
        let identifier = format!("user:{}", user_id);
        self.check(&identifier, path, &tier.rule()).await
    }

    /// 清除计数器
    pub async fn reset(&self, identifier: &str, path: &str) {
        if !self.cache.is_configured() {
            return;
        }

        let key = self.key(identifier, path);
        match self.cache.delete(&key).await {
            Ok(_) => info!(identifier, path, "Rate limit reset"),
            Err(e) => error!(identifier, path, error = %e, "Rate limit reset failed"),
        }
    }

    /// 查看计数器状态，不消耗配额
    pub async fn status(&self, identifier: &str, path: &str, rule: &RateLimitRule) -> RateLimitStatus {
        if !self.cache.is_configured() {
            return RateLimitStatus::empty(rule);
        }

        let key = self.key(identifier, path);
        match self.read_status(&key, rule).await {
            Ok(status) => status,
            Err(e) => {
                error!(identifier, path, error = %e, "Rate limit status check failed");
                RateLimitStatus::empty(rule)
            }
        }
    }

    async fn read_status(&self, key: &str, rule: &RateLimitRule) -> AppResult<RateLimitStatus> {
        let current = self.cache.get_int(key).await?.unwrap_or(0).max(0) as u64;
        let ttl = self.cache.ttl(key).await?.unwrap_or(0);
        let reset = if ttl > 0 {
            (self.clock)() + ttl as u64
        } else {
            0
        };

        Ok(RateLimitStatus {
            current,
            remaining: rule.max_requests().saturating_sub(current),
            reset,
        })
    }
}

fn record_decision(outcome: &'static str) {
    counter!("rate_limit_decisions_total", "outcome" => outcome).increment(1);
}
