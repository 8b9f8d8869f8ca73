//! PostgreSQL 健康探测

use async_trait::async_trait;
use lux_errors::{AppError, AppResult};
use lux_ports::DatabasePort;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::PgPool;
use tracing::debug;

/// 合法的表名（可带 schema）
static TABLE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap());

/// 对指定表执行一次最小读取
pub struct PostgresProbe {
    pool: PgPool,
    query: String,
}

impl PostgresProbe {
    /// 创建探测器，表名不合法时返回校验错误
    pub fn new(pool: PgPool, table: &str) -> AppResult<Self> {
        if !TABLE_NAME_REGEX.is_match(table) {
            return Err(AppError::validation(format!(
                "Invalid probe table name: {}",
                table
            )));
        }

        Ok(Self {
            pool,
            query: format!("SELECT 1 FROM {} LIMIT 1", table),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[async_trait]
impl DatabasePort for PostgresProbe {
    async fn probe_read(&self) -> AppResult<()> {
        match sqlx::query(&self.query).fetch_one(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::RowNotFound) => {
                debug!(query = %self.query, "Probe read returned no rows");
                Err(AppError::not_found("No rows found"))
            }
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }
}
