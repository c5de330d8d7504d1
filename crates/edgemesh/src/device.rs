//! Core data model shared by the registry, job engine, and cost estimator.

use serde::{Deserialize, Serialize};

/// Loopback/unspecified sentinels that must be rewritten to the observed
/// discovery source IP before an entry is trusted.
pub const LOOPBACK_SENTINELS: [&str; 3] = ["0.0.0.0", "127.0.0.1", "localhost"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub name: String,
    pub platform: String,
    pub arch: String,
    pub has_cpu: bool,
    pub has_gpu: bool,
    pub has_npu: bool,
    pub can_screen_capture: bool,
    pub has_local_model: bool,
    #[serde(default)]
    pub local_model_name: Option<String>,
    pub rpc_addr: String,
    #[serde(default)]
    pub prefill_tokens_per_s: f64,
    #[serde(default)]
    pub decode_tokens_per_s: f64,
    #[serde(default)]
    pub ram_free_mb: Option<i64>,
}

impl DeviceInfo {
    /// True if `rpc_addr`'s host component is a loopback/unspecified sentinel
    /// that must be rewritten at upsert time.
    pub fn host_is_sentinel(&self) -> bool {
        let host = self.rpc_addr.rsplit_once(':').map(|(h, _)| h).unwrap_or(&self.rpc_addr);
        LOOPBACK_SENTINELS.contains(&host)
    }

    /// Returns a copy with the host portion of `rpc_addr` replaced, keeping
    /// the original port.
    pub fn with_rewritten_host(&self, new_host: &str) -> Self {
        let mut out = self.clone();
        let port = self.rpc_addr.rsplit_once(':').map(|(_, p)| p).unwrap_or("0");
        out.rpc_addr = format!("{new_host}:{port}");
        out
    }

    pub fn is_llm_capable(&self) -> bool {
        self.prefill_tokens_per_s > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: String,
    /// Unix ms; 0 means "never observed".
    pub last_seen_unix_ms: i64,
    /// `-1` means unavailable.
    pub cpu_load: f64,
    pub mem_used_mb: i64,
    pub mem_total_mb: i64,
    pub gpu_load: Option<f64>,
    pub gpu_mem_used_mb: Option<i64>,
    pub gpu_mem_total_mb: Option<i64>,
    pub npu_load: Option<f64>,
}

impl DeviceStatus {
    pub fn unknown(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            last_seen_unix_ms: 0,
            cpu_load: -1.0,
            mem_used_mb: 0,
            mem_total_mb: 0,
            gpu_load: None,
            gpu_mem_used_mb: None,
            gpu_mem_total_mb: None,
            npu_load: None,
        }
    }
}

/// Device selection policy, modeled as a tagged enum so every routing
/// decision is exhaustively matched at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "device_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingPolicy {
    BestAvailable,
    RequireNpu,
    PreferRemote,
    ForceDeviceId(String),
    RequireLocalModel,
    PreferLocalModel,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::BestAvailable
    }
}

/// Result of [`crate::registry::select_device`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedDevice {
    pub device: Option<DeviceInfo>,
    pub executed_locally: bool,
    pub error: Option<String>,
}

impl SelectedDevice {
    pub fn err(message: impl Into<String>) -> Self {
        Self { device: None, executed_locally: false, error: Some(message.into()) }
    }
}

/// Capability tier used to rank devices NPU > GPU > CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CapabilityTier {
    Cpu,
    Gpu,
    Npu,
}

pub fn capability_tier(device: &DeviceInfo) -> CapabilityTier {
    if device.has_npu {
        CapabilityTier::Npu
    } else if device.has_gpu {
        CapabilityTier::Gpu
    } else {
        CapabilityTier::Cpu
    }
}
