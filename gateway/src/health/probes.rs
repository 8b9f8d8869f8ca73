//! 依赖探针
//!
//! 探针从不返回错误：任何失败都转换为 unhealthy 结果

use async_trait::async_trait;
use lux_common::{HealthCheckResult, HealthProbe, HealthStatus};
use lux_config::{GoogleMapsConfig, StripeConfig};
use lux_ports::{CachePort, DatabasePort};
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// 默认外部服务请求超时
pub const DEFAULT_EXTERNAL_TIMEOUT: Duration = Duration::from_secs(4);

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// 数据库探针
pub struct DatabaseProbe {
    database: Arc<dyn DatabasePort>,
    degraded_after: Duration,
}

impl DatabaseProbe {
    pub const NAME: &'static str = "database";

    pub fn new(database: Arc<dyn DatabasePort>, degraded_after: Duration) -> Self {
        Self {
            database,
            degraded_after,
        }
    }
}

#[async_trait]
impl HealthProbe for DatabaseProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self) -> HealthCheckResult {
        let start = Instant::now();

        match self.database.probe_read().await {
            // 空表同样说明连接正常
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                return HealthCheckResult::unhealthy(Self::NAME, elapsed_ms(start), e.to_string());
            }
        }

        let response_time = elapsed_ms(start);
        let status =
            HealthStatus::from_latency(response_time, self.degraded_after.as_millis() as u64);
        HealthCheckResult::new(Self::NAME, status, response_time).with_detail("connected", true)
    }
}

/// 缓存探针
pub struct CacheProbe {
    cache: Arc<dyn CachePort>,
    degraded_after: Duration,
}

impl CacheProbe {
    pub const NAME: &'static str = "redis";

    pub fn new(cache: Arc<dyn CachePort>, degraded_after: Duration) -> Self {
        Self {
            cache,
            degraded_after,
        }
    }
}

#[async_trait]
impl HealthProbe for CacheProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self) -> HealthCheckResult {
        if !self.cache.is_configured() {
            return HealthCheckResult::degraded(Self::NAME, 0).with_detail("configured", false);
        }

        let start = Instant::now();
        match self.cache.ping().await {
            Ok(()) => {
                let response_time = elapsed_ms(start);
                HealthCheckResult::new(
                    Self::NAME,
                    HealthStatus::from_latency(
                        response_time,
                        self.degraded_after.as_millis() as u64,
                    ),
                    response_time,
                )
            }
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                HealthCheckResult::unhealthy(Self::NAME, elapsed_ms(start), e.to_string())
            }
        }
    }
}

/// 外部服务凭证的传递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalAuth {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// 查询参数 `key=<key>`
    QueryKey,
}

/// 外部 HTTP 服务探针
pub struct ExternalServiceProbe {
    name: String,
    client: reqwest::Client,
    url: String,
    auth: ExternalAuth,
    api_key: Option<Secret<String>>,
    timeout: Duration,
}

impl ExternalServiceProbe {
    pub fn new(
        name: impl Into<String>,
        client: reqwest::Client,
        url: impl Into<String>,
        auth: ExternalAuth,
        api_key: Option<Secret<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            url: url.into(),
            auth,
            api_key,
            timeout: DEFAULT_EXTERNAL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stripe 账户接口
    pub fn stripe(client: reqwest::Client, config: &StripeConfig) -> Self {
        Self::new(
            "stripe",
            client,
            &config.url,
            ExternalAuth::Bearer,
            config.api_key().cloned(),
        )
    }

    /// Google Maps 地理编码接口
    pub fn google_maps(client: reqwest::Client, config: &GoogleMapsConfig) -> Self {
        Self::new(
            "googlemaps",
            client,
            &config.url,
            ExternalAuth::QueryKey,
            config.api_key().cloned(),
        )
    }
}

#[async_trait]
impl HealthProbe for ExternalServiceProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthCheckResult {
        let Some(api_key) = &self.api_key else {
            return HealthCheckResult::degraded(&self.name, 0).with_detail("configured", false);
        };

        let request = self.client.get(&self.url).timeout(self.timeout);
        let request = match self.auth {
            ExternalAuth::Bearer => request.bearer_auth(api_key.expose_secret()),
            ExternalAuth::QueryKey => request.query(&[("key", api_key.expose_secret())]),
        };

        let start = Instant::now();
        match request.send().await {
            Ok(response) => {
                let response_time = elapsed_ms(start);
                let status = response.status();
                let result = if status.is_success() {
                    HealthCheckResult::healthy(&self.name, response_time)
                } else {
                    HealthCheckResult::unhealthy(
                        &self.name,
                        response_time,
                        format!("Unexpected status {}", status.as_u16()),
                    )
                };
                result.with_detail("statusCode", status.as_u16())
            }
            Err(e) => {
                // 错误信息中的 URL 可能带有密钥
                let e = e.without_url();
                warn!(service = %self.name, error = %e, "External service health check failed");
                HealthCheckResult::unhealthy(&self.name, elapsed_ms(start), e.to_string())
            }
        }
    }
}
