//! 健康检查聚合器
//!
//! 每个探针在独立任务中运行并带有超时，全部结束后按声明顺序汇总

use futures::future::join_all;
use lux_common::{HealthCheckResult, HealthProbe, HealthReport, HealthStatus};
use metrics::{gauge, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

/// 默认单个探针超时
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// 健康检查聚合器
pub struct HealthAggregator {
    probes: Vec<Arc<dyn HealthProbe>>,
    probe_timeout: Duration,
    started_at: Instant,
    version: String,
}

impl HealthAggregator {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            probes: Vec::new(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            started_at: Instant::now(),
            version: version.into(),
        }
    }

    /// 追加探针，报告中的顺序与追加顺序一致
    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// 进程运行时长（秒）
    pub fn uptime(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// 运行全部探针并生成报告
    pub async fn run(&self) -> HealthReport {
        let start = Instant::now();
        info!("Starting health check");

        let tasks = self
            .probes
            .iter()
            .map(|probe| {
                let name = probe.name().to_string();
                let handle = tokio::spawn(run_probe(probe.clone(), self.probe_timeout));
                async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(e) => {
                            error!(check = %name, error = %e, "Health probe task failed");
                            HealthCheckResult::unhealthy(name, elapsed_ms(start), e.to_string())
                        }
                    }
                }
            })
            .collect::<Vec<_>>();

        let checks = join_all(tasks).await;
        let report = HealthReport::new(checks, self.uptime(), &self.version);

        let duration = elapsed_ms(start);
        histogram!("health_check_duration_ms").record(duration as f64);
        for check in &report.checks {
            gauge!("health_check_status", "check" => check.name.clone())
                .set(status_value(check.status));
        }

        info!(
            status = report.status().as_str(),
            duration_ms = duration,
            checks_count = report.checks.len(),
            "Health check completed"
        );

        report
    }
}

async fn run_probe(probe: Arc<dyn HealthProbe>, probe_timeout: Duration) -> HealthCheckResult {
    let start = Instant::now();
    match tokio::time::timeout(probe_timeout, probe.check()).await {
        Ok(result) => result,
        Err(_) => HealthCheckResult::unhealthy(
            probe.name(),
            elapsed_ms(start),
            "Health check timed out",
        ),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn status_value(status: HealthStatus) -> f64 {
    match status {
        HealthStatus::Healthy => 0.0,
        HealthStatus::Degraded => 1.0,
        HealthStatus::Unhealthy => 2.0,
    }
}
