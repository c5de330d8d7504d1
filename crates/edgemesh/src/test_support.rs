//! Shared test infrastructure: fakes for the external collaborator traits
//! so subsystem tests don't depend on real hardware or a real
//! peer.

use async_trait::async_trait;

use crate::stream::capture::{RawFrame, ScreenCapture};
use crate::sysmetrics::{MetricsSampler, SystemMetrics};

/// Screen-capture fake returning a fixed solid-color frame.
pub struct FakeScreenCapture {
    pub width: u32,
    pub height: u32,
}

impl Default for FakeScreenCapture {
    fn default() -> Self {
        Self { width: 64, height: 64 }
    }
}

#[async_trait]
impl ScreenCapture for FakeScreenCapture {
    async fn capture(&self, _monitor_index: i32) -> Option<RawFrame> {
        Some(RawFrame { width: self.width, height: self.height, rgb: vec![0u8; (self.width * self.height * 3) as usize] })
    }

    async fn monitor_count(&self) -> usize {
        1
    }
}

/// Metrics sampler fake returning a fixed, deterministic snapshot.
pub struct FakeMetricsSampler {
    pub sample: SystemMetrics,
}

impl Default for FakeMetricsSampler {
    fn default() -> Self {
        Self {
            sample: SystemMetrics {
                cpu_load: 0.25,
                mem_used_mb: 1024,
                mem_total_mb: 8192,
                gpu_load: 0.0,
                gpu_mem_used_mb: 0,
                gpu_mem_total_mb: 0,
                npu_load: 0.0,
                timestamp_ms: 0,
            },
        }
    }
}

#[async_trait]
impl MetricsSampler for FakeMetricsSampler {
    async fn sample(&self) -> SystemMetrics {
        self.sample.clone()
    }
}
