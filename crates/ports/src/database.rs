//! Database trait 定义

use async_trait::async_trait;
use lux_errors::AppResult;

/// 数据库探测端口
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait DatabasePort: Send + Sync {
    /// 执行一次最小读取
    ///
    /// 查询成功但没有任何行时返回 `AppError::NotFound`，
    /// 调用方据此区分“空表”和真正的查询错误
    async fn probe_read(&self) -> AppResult<()>;
}
