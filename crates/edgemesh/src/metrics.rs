//! Per-device ring-buffered metrics time series.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::registry::now_unix_ms;

const MAX_SAMPLES: usize = 120;
const RETENTION: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSample {
    pub timestamp_ms: i64,
    pub cpu_load: f64,
    pub mem_used_mb: i64,
    pub mem_total_mb: i64,
    pub gpu_load: Option<f64>,
    pub gpu_mem_used_mb: Option<i64>,
    pub gpu_mem_total_mb: Option<i64>,
    pub npu_load: Option<f64>,
}

struct DeviceSeries {
    name: String,
    samples: VecDeque<MetricsSample>,
    last_update_ms: i64,
}

/// Outer store lock guards the device map; per-device locking isn't needed
/// here because the outer lock is held only for the duration of the
/// in-memory push/read, never across I/O.
pub struct MetricsStore {
    devices: RwLock<HashMap<String, DeviceSeries>>,
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsStore {
    pub fn new() -> Self {
        Self { devices: RwLock::new(HashMap::new()) }
    }

    pub async fn add_sample(&self, device_id: &str, name: &str, sample: MetricsSample) {
        let mut devices = self.devices.write().await;
        let series = devices.entry(device_id.to_string()).or_insert_with(|| DeviceSeries {
            name: name.to_string(),
            samples: VecDeque::new(),
            last_update_ms: 0,
        });
        series.name = name.to_string();
        series.last_update_ms = sample.timestamp_ms;
        if series.samples.len() >= MAX_SAMPLES {
            series.samples.pop_front();
        }
        series.samples.push_back(sample);
    }

    pub async fn get_history(&self, device_id: &str, since_ms: i64) -> Vec<MetricsSample> {
        let devices = self.devices.read().await;
        match devices.get(device_id) {
            Some(series) => series
                .samples
                .iter()
                .filter(|s| since_ms == 0 || s.timestamp_ms > since_ms)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Drops devices whose `last_update` is older than the retention window.
    pub async fn cleanup(&self) -> Vec<String> {
        let now = now_unix_ms();
        let mut devices = self.devices.write().await;
        let stale: Vec<String> = devices
            .iter()
            .filter(|(_, series)| now - series.last_update_ms > RETENTION.as_millis() as i64)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            devices.remove(id);
        }
        stale
    }
}

#[path = "metrics_tests.rs"]
#[cfg(test)]
mod metrics_tests;
