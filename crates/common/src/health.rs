//! 通用健康检查模块
//!
//! 提供健康检查的数据模型、状态推导规则和探针 trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 健康状态
///
/// 变体按严重程度排序，`Healthy < Degraded < Unhealthy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    /// 按耗时阈值判定：低于阈值为 healthy，否则 degraded
    pub fn from_latency(latency_ms: u64, threshold_ms: u64) -> Self {
        if latency_ms < threshold_ms {
            Self::Healthy
        } else {
            Self::Degraded
        }
    }

    /// 汇总多个状态：任一 unhealthy 则 unhealthy；否则任一 degraded 则 degraded；否则 healthy
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses.into_iter().max().unwrap_or(Self::Healthy)
    }

    /// 是否仍可对外服务（healthy 与 degraded 都返回 200）
    pub fn is_serving(&self) -> bool {
        !matches!(self, Self::Unhealthy)
    }
}

/// 单个依赖的检查结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    /// 依赖名称
    pub name: String,
    /// 状态
    pub status: HealthStatus,
    /// 响应耗时（毫秒）
    pub response_time: u64,
    /// 错误信息（仅面向运维）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 附加信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl HealthCheckResult {
    pub fn new(name: impl Into<String>, status: HealthStatus, response_time: u64) -> Self {
        Self {
            name: name.into(),
            status,
            response_time,
            error: None,
            details: None,
        }
    }

    pub fn healthy(name: impl Into<String>, response_time: u64) -> Self {
        Self::new(name, HealthStatus::Healthy, response_time)
    }

    pub fn degraded(name: impl Into<String>, response_time: u64) -> Self {
        Self::new(name, HealthStatus::Degraded, response_time)
    }

    pub fn unhealthy(
        name: impl Into<String>,
        response_time: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(name, HealthStatus::Unhealthy, response_time)
        }
    }

    /// 追加一条附加信息
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// 聚合健康报告
///
/// `status` 只能由 `checks` 推导，不提供单独的 setter
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    /// 进程运行时长（秒）
    pub uptime: u64,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checks: Vec<HealthCheckResult>,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheckResult>, uptime: u64, version: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::aggregate(checks.iter().map(|c| c.status)),
            timestamp: Utc::now(),
            uptime,
            version: version.into(),
            error: None,
            checks,
        }
    }

    /// 聚合器本身无法运行时返回的兜底报告
    pub fn fallback(version: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            timestamp: Utc::now(),
            uptime: 0,
            version: version.into(),
            error: Some("Health check failed".to_string()),
            checks: Vec::new(),
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn check(&self, name: &str) -> Option<&HealthCheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// 存活检查状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStatus {
    Ok,
    Error,
}

impl LivenessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// 存活检查结果
#[derive(Debug, Clone, Serialize)]
pub struct LivenessResult {
    pub status: LivenessStatus,
    pub timestamp: DateTime<Utc>,
}

impl LivenessResult {
    pub fn ok() -> Self {
        Self {
            status: LivenessStatus::Ok,
            timestamp: Utc::now(),
        }
    }

    pub fn error() -> Self {
        Self {
            status: LivenessStatus::Error,
            timestamp: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == LivenessStatus::Ok
    }
}

/// 依赖探针
///
/// 实现方不得返回错误或 panic 外泄：任何失败都应转换为 unhealthy 结果
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// 探针名称，即报告中的 `name`
    fn name(&self) -> &str;

    /// 执行一次检查
    async fn check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = HealthStatus> {
        prop_oneof![
            Just(HealthStatus::Healthy),
            Just(HealthStatus::Degraded),
            Just(HealthStatus::Unhealthy),
        ]
    }

    #[test]
    fn test_from_latency() {
        assert_eq!(HealthStatus::from_latency(999, 1000), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_latency(1000, 1000), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_latency(499, 500), HealthStatus::Healthy);
    }

    #[test]
    fn test_empty_checks_are_healthy() {
        let report = HealthReport::new(vec![], 10, "1.0.0");
        assert_eq!(report.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_unhealthy_dominates_degraded() {
        let report = HealthReport::new(
            vec![
                HealthCheckResult::degraded("redis", 0),
                HealthCheckResult::unhealthy("database", 12, "connection refused"),
                HealthCheckResult::healthy("stripe", 80),
            ],
            1,
            "1.0.0",
        );
        assert_eq!(report.status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_check_result_serializes_camel_case() {
        let check = HealthCheckResult::degraded("redis", 0).with_detail("configured", false);
        let json = serde_json::to_value(&check).unwrap();

        assert_eq!(json["name"], "redis");
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["responseTime"], 0);
        assert_eq!(json["details"]["configured"], false);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_fallback_report() {
        let report = HealthReport::fallback("2.3.1");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["error"], "Health check failed");
        assert_eq!(json["checks"].as_array().unwrap().len(), 0);
        assert_eq!(json["version"], "2.3.1");
    }

    #[test]
    fn test_liveness_status_strings() {
        assert_eq!(LivenessResult::ok().status.as_str(), "ok");
        assert_eq!(LivenessResult::error().status.as_str(), "error");
    }

    proptest! {
        #[test]
        fn prop_report_status_follows_derivation_rule(
            statuses in proptest::collection::vec(status_strategy(), 0..12)
        ) {
            let checks = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| HealthCheckResult::new(format!("check-{i}"), *s, 0))
                .collect::<Vec<_>>();
            let report = HealthReport::new(checks, 0, "test");

            let any_unhealthy = statuses.contains(&HealthStatus::Unhealthy);
            let any_degraded = statuses.contains(&HealthStatus::Degraded);

            prop_assert_eq!(report.status() == HealthStatus::Unhealthy, any_unhealthy);
            prop_assert_eq!(
                report.status() == HealthStatus::Degraded,
                !any_unhealthy && any_degraded
            );
            prop_assert_eq!(
                report.status() == HealthStatus::Healthy,
                !any_unhealthy && !any_degraded
            );
        }
    }
}
