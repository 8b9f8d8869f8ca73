//! lux-config - 配置加载库
//!
//! 加载顺序：`{dir}/default.toml` → `{dir}/{APP_ENV}.toml` → `LUX_` 前缀环境变量
//! （嵌套字段用 `__` 分隔，例如 `LUX_REDIS__URL`）

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 健康检查读取的表
    #[serde(default = "default_probe_table")]
    pub probe_table: String,
}

fn default_max_connections() -> u32 {
    // 开发环境: 5, 生产环境: 20
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 20,
        _ => 5,
    }
}

fn default_probe_table() -> String {
    "profiles".to_string()
}

/// Redis 配置
///
/// 整个段落缺省时视为未配置缓存
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 输出 JSON 日志（生产环境）
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            metrics_enabled: true,
        }
    }
}

/// 限流配置
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "ratelimit".to_string()
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: default_key_prefix(),
        }
    }
}

/// 健康检查配置
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// 单个探针超时（秒）
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// 数据库降级阈值（毫秒）
    #[serde(default = "default_database_degraded_ms")]
    pub database_degraded_ms: u64,
    /// 缓存降级阈值（毫秒）
    #[serde(default = "default_cache_degraded_ms")]
    pub cache_degraded_ms: u64,
    /// 存活检查内存上限（MiB）
    #[serde(default = "default_memory_ceiling_mb")]
    pub memory_ceiling_mb: u64,
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_database_degraded_ms() -> u64 {
    1000
}

fn default_cache_degraded_ms() -> u64 {
    500
}

fn default_memory_ceiling_mb() -> u64 {
    512
}

/// 内存上限的最大可配置值（1 TiB）
pub const MAX_MEMORY_CEILING_MB: u64 = 1024 * 1024;

impl HealthConfig {
    /// 内存上限（字节）
    pub fn memory_ceiling_bytes(&self) -> u64 {
        self.memory_ceiling_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout_secs(),
            database_degraded_ms: default_database_degraded_ms(),
            cache_degraded_ms: default_cache_degraded_ms(),
            memory_ceiling_mb: default_memory_ceiling_mb(),
        }
    }
}

/// Stripe 配置（仅用于健康探测）
#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    #[serde(default = "default_stripe_url")]
    pub url: String,
    pub api_key: Option<Secret<String>>,
}

fn default_stripe_url() -> String {
    "https://api.stripe.com/v1/account".to_string()
}

impl StripeConfig {
    pub fn api_key(&self) -> Option<&Secret<String>> {
        non_empty(&self.api_key)
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            url: default_stripe_url(),
            api_key: None,
        }
    }
}

/// Google Maps 配置（仅用于健康探测）
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleMapsConfig {
    #[serde(default = "default_google_maps_url")]
    pub url: String,
    pub api_key: Option<Secret<String>>,
}

fn default_google_maps_url() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json?address=London".to_string()
}

impl GoogleMapsConfig {
    pub fn api_key(&self) -> Option<&Secret<String>> {
        non_empty(&self.api_key)
    }
}

impl Default for GoogleMapsConfig {
    fn default() -> Self {
        Self {
            url: default_google_maps_url(),
            api_key: None,
        }
    }
}

/// 空串视为未配置
fn non_empty(key: &Option<Secret<String>>) -> Option<&Secret<String>> {
    key.as_ref()
        .filter(|k| !k.expose_secret().trim().is_empty())
}

/// 第三方服务配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationsConfig {
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub google_maps: GoogleMapsConfig,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

fn default_app_name() -> String {
    "lux-gateway".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_app_version() -> String {
    "1.0.0".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("LUX_").split("__"));

        Self::from_figment(figment)
    }

    /// 从已组装的 Figment 提取并校验
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.health.probe_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "health.probe_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.health.memory_ceiling_mb == 0
            || self.health.memory_ceiling_mb > MAX_MEMORY_CEILING_MB
        {
            return Err(ConfigError::Invalid(format!(
                "health.memory_ceiling_mb must be between 1 and {}",
                MAX_MEMORY_CEILING_MB
            )));
        }
        if self.rate_limit.key_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "rate_limit.key_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// 是否配置了缓存
    pub fn cache_configured(&self) -> bool {
        self.redis
            .as_ref()
            .is_some_and(|r| !r.url.expose_secret().trim().is_empty())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
