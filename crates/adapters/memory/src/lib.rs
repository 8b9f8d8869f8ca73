//! lux-adapter-memory - 进程内缓存适配器
//!
//! 单实例部署和测试使用；多实例部署应使用 Redis

mod cache;

pub use cache::*;
