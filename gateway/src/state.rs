//! 应用状态
//!
//! 启动时根据配置组装适配器、探针和限流器

use crate::health::{
    CacheProbe, DatabaseProbe, ExternalServiceProbe, HealthAggregator, LivenessProbe, MemoryGauge,
    ProcessMemoryGauge,
};
use crate::rate_limit::{RateLimitMiddleware, RateLimiter};
use lux_adapter_postgres::{PostgresConfig, PostgresProbe, create_lazy_pool};
use lux_adapter_redis::{RedisCache, create_connection_manager};
use lux_bootstrap::{RetryConfig, with_retry_optional};
use lux_config::AppConfig;
use lux_errors::{AppError, AppResult};
use lux_ports::{CachePort, DatabasePort, NoopCache};
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<HealthAggregator>,
    pub liveness: Arc<LivenessProbe>,
    pub rate_limit: Arc<RateLimitMiddleware>,
    pub metrics: Option<PrometheusHandle>,
}

/// 已连接的外部依赖
pub struct Dependencies {
    pub database: Arc<dyn DatabasePort>,
    pub cache: Arc<dyn CachePort>,
    pub http: reqwest::Client,
    pub memory: Arc<dyn MemoryGauge>,
}

impl Dependencies {
    /// 按配置连接真实依赖
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let pg_config = PostgresConfig::new(config.database.url.expose_secret())
            .with_max_connections(config.database.max_connections);
        // 延迟建连：数据库不可用时进程照常启动，由健康检查报告
        let pool = create_lazy_pool(&pg_config)?;
        let database = Arc::new(PostgresProbe::new(pool, &config.database.probe_table)?);
        info!(
            max_connections = config.database.max_connections,
            probe_table = %config.database.probe_table,
            "PostgreSQL pool configured"
        );

        let http = reqwest::Client::builder()
            .user_agent(format!("{}/{}", config.app_name, config.app_version))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            database,
            cache: connect_cache(config).await,
            http,
            memory: Arc::new(ProcessMemoryGauge::new()?),
        })
    }
}

/// 连接缓存；未配置或连接失败时退化为空实现
async fn connect_cache(config: &AppConfig) -> Arc<dyn CachePort> {
    let Some(redis) = config.redis.as_ref().filter(|_| config.cache_configured()) else {
        warn!("Redis not configured, caching and rate limiting are disabled");
        return Arc::new(NoopCache);
    };

    let retry = RetryConfig::new(3, 500, 2000);
    let url = redis.url.expose_secret().clone();
    let conn = with_retry_optional(&retry, "Redis connection", || {
        let url = url.clone();
        async move { create_connection_manager(&url).await }
    })
    .await;

    match conn {
        Some(conn) => {
            info!("Redis connection created");
            Arc::new(RedisCache::new(conn))
        }
        None => Arc::new(NoopCache),
    }
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        deps: Dependencies,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let health = &config.health;
        let probe_timeout = Duration::from_secs(health.probe_timeout_secs);
        // 外部请求本身的超时略短于探针超时
        let external_timeout = probe_timeout
            .saturating_sub(Duration::from_secs(1))
            .max(Duration::from_secs(1));

        let aggregator = HealthAggregator::new(&config.app_version)
            .with_timeout(probe_timeout)
            .with_probe(Arc::new(DatabaseProbe::new(
                deps.database,
                Duration::from_millis(health.database_degraded_ms),
            )))
            .with_probe(Arc::new(CacheProbe::new(
                deps.cache.clone(),
                Duration::from_millis(health.cache_degraded_ms),
            )))
            .with_probe(Arc::new(
                ExternalServiceProbe::stripe(deps.http.clone(), &config.integrations.stripe)
                    .with_timeout(external_timeout),
            ))
            .with_probe(Arc::new(
                ExternalServiceProbe::google_maps(deps.http, &config.integrations.google_maps)
                    .with_timeout(external_timeout),
            ));

        let liveness = LivenessProbe::new(deps.memory, health.memory_ceiling_bytes());

        let limiter = RateLimiter::with_prefix(deps.cache, &config.rate_limit.key_prefix);
        let rate_limit = RateLimitMiddleware::new(Arc::new(limiter), config.rate_limit.enabled);

        Self {
            aggregator: Arc::new(aggregator),
            liveness: Arc::new(liveness),
            rate_limit: Arc::new(rate_limit),
            metrics,
        }
    }

    pub fn version(&self) -> &str {
        self.aggregator.version()
    }
}
