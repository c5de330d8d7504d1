//! System-metrics sampler contract: an external collaborator per
//! platform. The core only depends on this trait; OS-specific scrapers are
//! out of scope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_load: f64,
    pub mem_used_mb: i64,
    pub mem_total_mb: i64,
    pub gpu_load: f64,
    pub gpu_mem_used_mb: i64,
    pub gpu_mem_total_mb: i64,
    pub npu_load: f64,
    pub timestamp_ms: i64,
}

#[async_trait]
pub trait MetricsSampler: Send + Sync {
    async fn sample(&self) -> SystemMetrics;
}

/// Sampler returning all-unavailable metrics, used when no platform-specific
/// sampler is wired in (e.g. unsupported host, or unit tests).
pub struct UnavailableSampler;

#[async_trait]
impl MetricsSampler for UnavailableSampler {
    async fn sample(&self) -> SystemMetrics {
        SystemMetrics {
            cpu_load: -1.0,
            mem_used_mb: 0,
            mem_total_mb: 0,
            gpu_load: -1.0,
            gpu_mem_used_mb: 0,
            gpu_mem_total_mb: 0,
            npu_load: -1.0,
            timestamp_ms: crate::registry::now_unix_ms(),
        }
    }
}
