//! 健康检查
//!
//! 依赖探针、并发聚合器和不依赖外部服务的存活检查

pub mod aggregator;
pub mod liveness;
pub mod probes;

pub use aggregator::HealthAggregator;
pub use liveness::{LivenessProbe, MemoryGauge, ProcessMemoryGauge};
pub use probes::{CacheProbe, DatabaseProbe, ExternalAuth, ExternalServiceProbe};
