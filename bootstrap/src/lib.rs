//! lux-bootstrap - 统一服务启动骨架
//!
//! 运行时初始化、启动期重试与 graceful shutdown

mod retry;
mod runtime;
mod shutdown;

pub use retry::*;
pub use runtime::*;
pub use shutdown::*;
