//! 存活检查
//!
//! 只检查进程自身的内存占用，不访问任何外部依赖

use lux_common::LivenessResult;
use lux_errors::{AppError, AppResult};
use parking_lot::Mutex;
use std::sync::Arc;
use sysinfo::{Pid, System};
use tracing::{error, warn};

/// 默认内存上限 512 MiB
pub const DEFAULT_MEMORY_CEILING: u64 = 512 * 1024 * 1024;

/// 内存读数来源
pub trait MemoryGauge: Send + Sync {
    /// 当前占用（字节）
    fn used_bytes(&self) -> AppResult<u64>;
}

/// 读取当前进程的常驻内存
pub struct ProcessMemoryGauge {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessMemoryGauge {
    pub fn new() -> AppResult<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| AppError::internal(format!("Failed to resolve current pid: {}", e)))?;

        Ok(Self {
            pid,
            system: Mutex::new(System::new()),
        })
    }
}

impl MemoryGauge for ProcessMemoryGauge {
    fn used_bytes(&self) -> AppResult<u64> {
        let mut system = self.system.lock();
        system.refresh_process(self.pid);
        system
            .process(self.pid)
            .map(|process| process.memory())
            .ok_or_else(|| AppError::internal("Current process not found"))
    }
}

/// 存活探针
#[derive(Clone)]
pub struct LivenessProbe {
    gauge: Arc<dyn MemoryGauge>,
    ceiling_bytes: u64,
}

impl LivenessProbe {
    pub fn new(gauge: Arc<dyn MemoryGauge>, ceiling_bytes: u64) -> Self {
        Self {
            gauge,
            ceiling_bytes,
        }
    }

    pub fn ceiling_bytes(&self) -> u64 {
        self.ceiling_bytes
    }

    pub fn check(&self) -> LivenessResult {
        match self.gauge.used_bytes() {
            Ok(used) if used >= self.ceiling_bytes => {
                warn!(
                    used_bytes = used,
                    ceiling_bytes = self.ceiling_bytes,
                    "Liveness check failed - high memory usage"
                );
                LivenessResult::error()
            }
            Ok(_) => LivenessResult::ok(),
            Err(e) => {
                error!(error = %e, "Liveness check failed");
                LivenessResult::error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGauge(AppResult<u64>);

    impl MemoryGauge for FixedGauge {
        fn used_bytes(&self) -> AppResult<u64> {
            self.0.clone()
        }
    }

    fn probe(reading: AppResult<u64>) -> LivenessProbe {
        LivenessProbe::new(Arc::new(FixedGauge(reading)), DEFAULT_MEMORY_CEILING)
    }

    #[test]
    fn test_below_ceiling_is_ok() {
        assert!(probe(Ok(64 * 1024 * 1024)).check().is_ok());
        assert!(probe(Ok(DEFAULT_MEMORY_CEILING - 1)).check().is_ok());
    }

    #[test]
    fn test_at_ceiling_is_error() {
        assert!(!probe(Ok(DEFAULT_MEMORY_CEILING)).check().is_ok());
        assert!(!probe(Ok(DEFAULT_MEMORY_CEILING * 2)).check().is_ok());
    }

    #[test]
    fn test_gauge_failure_is_error() {
        let result = probe(Err(AppError::internal("no procfs"))).check();
        assert!(!result.is_ok());
    }

    #[test]
    fn test_process_gauge_reads_memory() {
        let gauge = ProcessMemoryGauge::new().unwrap();
        assert!(gauge.used_bytes().unwrap() > 0);
    }
}
