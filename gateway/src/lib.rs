//! lux-gateway - 豪华专车预订前端的网关
//!
//! 健康检查聚合、存活检查与固定窗口限流

pub mod cache;
pub mod health;
pub mod middleware;
pub mod rate_limit;
pub mod routing;
pub mod state;

pub use routing::router;
pub use state::{AppState, Dependencies};
