//! 数据结构定义

use lux_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 单个限流规则
///
/// 只能经 `new` 或反序列化时的同一校验构造，配额与窗口均大于 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRateLimitRule")]
pub struct RateLimitRule {
    /// 时间窗口内的最大请求数
    max_requests: u64,
    /// 时间窗口（秒）
    window_secs: u64,
}

#[derive(Deserialize)]
struct RawRateLimitRule {
    max_requests: u64,
    window_secs: u64,
}

impl TryFrom<RawRateLimitRule> for RateLimitRule {
    type Error = AppError;

    fn try_from(raw: RawRateLimitRule) -> AppResult<Self> {
        Self::new(raw.max_requests, raw.window_secs)
    }
}

impl RateLimitRule {
    pub fn new(max_requests: u64, window_secs: u64) -> AppResult<Self> {
        if max_requests == 0 {
            return Err(AppError::validation("max_requests must be greater than 0"));
        }
        if window_secs == 0 {
            return Err(AppError::validation("window_secs must be greater than 0"));
        }
        Ok(Self {
            max_requests,
            window_secs,
        })
    }

    /// 内置预设，调用方保证参数非 0
    pub(crate) const fn preset(max_requests: u64, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// 按路由分类的预设规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutePreset {
    /// 通用 API
    Api,
    /// 登录、注册等认证接口
    Auth,
    /// 下单
    Booking,
    /// 支付
    Payment,
}

impl RoutePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Auth => "auth",
            Self::Booking => "booking",
            Self::Payment => "payment",
        }
    }

    pub fn rule(&self) -> RateLimitRule {
        let max_requests = match self {
            Self::Api => 100,
            Self::Auth => 5,
            Self::Booking => 10,
            Self::Payment => 3,
        };
        RateLimitRule::preset(max_requests, 60)
    }
}

/// 限流检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// 是否允许请求
    pub allowed: bool,
    /// 本次检查前窗口内的请求计数
    pub current: u64,
    /// 限制的最大请求数
    pub limit: u64,
    /// 剩余可用请求数
    pub remaining: u64,
    /// 窗口重置时间（Unix 秒），0 表示未知
    pub reset: u64,
    /// 时间窗口（秒）
    pub window_secs: u64,
    /// 建议重试等待时间（秒，仅在拒绝时有值）
    pub retry_after: Option<u64>,
}

impl RateLimitResult {
    /// 无法判断时放行
    pub fn pass_through(rule: &RateLimitRule) -> Self {
        Self {
            allowed: true,
            current: 0,
            limit: rule.max_requests,
            remaining: rule.max_requests,
            reset: 0,
            window_secs: rule.window_secs,
            retry_after: None,
        }
    }

    pub fn admitted(rule: &RateLimitRule, current: u64, reset: u64) -> Self {
        Self {
            allowed: true,
            current,
            limit: rule.max_requests,
            remaining: rule.max_requests.saturating_sub(current + 1),
            reset,
            window_secs: rule.window_secs,
            retry_after: None,
        }
    }

    pub fn rejected(rule: &RateLimitRule, current: u64, reset: u64) -> Self {
        Self {
            allowed: false,
            current,
            limit: rule.max_requests,
            remaining: 0,
            reset,
            window_secs: rule.window_secs,
            retry_after: Some(rule.window_secs),
        }
    }
}

/// 计数器当前状态（只读，不消耗配额）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub current: u64,
    pub remaining: u64,
    pub reset: u64,
}

impl RateLimitStatus {
    pub fn empty(rule: &RateLimitRule) -> Self {
        Self {
            current: 0,
            remaining: rule.max_requests,
            reset: 0,
        }
    }
}

/// 429 响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitExceededBody {
    pub error: String,
    pub message: String,
    pub reset: u64,
}

impl RateLimitExceededBody {
    pub fn new(result: &RateLimitResult) -> Self {
        Self {
            error: "Rate limit exceeded".to_string(),
            message: format!(
                "Too many requests. Limit: {} per {} seconds",
                result.limit, result.window_secs
            ),
            reset: result.reset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_presets() {
        assert_eq!(RoutePreset::Api.rule(), RateLimitRule::new(100, 60).unwrap());
        assert_eq!(RoutePreset::Auth.rule().max_requests(), 5);
        assert_eq!(RoutePreset::Booking.rule().max_requests(), 10);
        assert_eq!(RoutePreset::Payment.rule().max_requests(), 3);
        assert_eq!(RoutePreset::Payment.as_str(), "payment");
    }

    #[test]
    fn test_rule_rejects_zero() {
        assert!(RateLimitRule::new(0, 60).is_err());
        assert!(RateLimitRule::new(10, 0).is_err());
        assert_eq!(RateLimitRule::new(10, 30).unwrap().window(), Duration::from_secs(30));
    }

    #[test]
    fn test_deserialize_validates_rule() {
        let rule: RateLimitRule =
            serde_json::from_str(r#"{"max_requests":10,"window_secs":60}"#).unwrap();
        assert_eq!(rule, RateLimitRule::new(10, 60).unwrap());

        assert!(serde_json::from_str::<RateLimitRule>(r#"{"max_requests":0,"window_secs":60}"#).is_err());
        assert!(serde_json::from_str::<RateLimitRule>(r#"{"max_requests":5,"window_secs":0}"#).is_err());
    }

    #[test]
    fn test_admitted_remaining() {
        let rule = RateLimitRule::new(5, 60).unwrap();
        assert_eq!(RateLimitResult::admitted(&rule, 0, 100).remaining, 4);
        assert_eq!(RateLimitResult::admitted(&rule, 4, 100).remaining, 0);
    }

    #[test]
    fn test_rejected_result() {
        let rule = RoutePreset::Auth.rule();
        let result = RateLimitResult::rejected(&rule, 5, 1_700_000_060);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.retry_after, Some(60));
    }

    #[test]
    fn test_exceeded_body() {
        let rule = RateLimitRule::new(10, 60).unwrap();
        let body = RateLimitExceededBody::new(&RateLimitResult::rejected(&rule, 10, 42));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"], "Rate limit exceeded");
        assert_eq!(json["message"], "Too many requests. Limit: 10 per 60 seconds");
        assert_eq!(json["reset"], 42);
    }
}
