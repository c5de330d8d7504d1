//! In-memory device catalog with liveness, status, and capability-based
//! selection.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::device::{capability_tier, CapabilityTier, DeviceInfo, DeviceStatus, RoutingPolicy, SelectedDevice};
use crate::error::DomainError;

#[derive(Debug, Clone)]
struct Entry {
    device: DeviceInfo,
    status: DeviceStatus,
}

/// Single reader/writer lock protecting the device map.
pub struct Registry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Inserts or overwrites by `device_id`, stamping `last_seen=now`.
    pub async fn upsert(&self, device: DeviceInfo) -> Result<i64, DomainError> {
        if device.device_id.is_empty() {
            return Err(DomainError::invalid_argument("device_id must not be empty"));
        }
        if device.rpc_addr.is_empty() {
            return Err(DomainError::invalid_argument("rpc_addr must not be empty"));
        }

        let now = now_unix_ms();
        let mut entries = self.entries.write().await;
        let status = entries
            .get(&device.device_id)
            .map(|e| DeviceStatus { last_seen_unix_ms: now, ..e.status.clone() })
            .unwrap_or_else(|| DeviceStatus { last_seen_unix_ms: now, ..DeviceStatus::unknown(device.device_id.clone()) });
        entries.insert(device.device_id.clone(), Entry { device, status });
        Ok(now)
    }

    /// Snapshot of all known devices, unspecified order.
    pub async fn list(&self) -> Vec<DeviceInfo> {
        self.entries.read().await.values().map(|e| e.device.clone()).collect()
    }

    pub async fn get(&self, id: &str) -> Option<DeviceInfo> {
        self.entries.read().await.get(id).map(|e| e.device.clone())
    }

    /// Returns a zeroed status if unknown — not an error.
    pub async fn get_status(&self, id: &str) -> DeviceStatus {
        self.entries
            .read()
            .await
            .get(id)
            .map(|e| e.status.clone())
            .unwrap_or_else(|| DeviceStatus::unknown(id))
    }

    pub async fn update_status(&self, id: &str, status: DeviceStatus) {
        let now = now_unix_ms();
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(id) {
            entry.status = DeviceStatus { last_seen_unix_ms: now, ..status };
        } else {
            debug!(device_id = id, "status update for unknown device ignored");
        }
    }

    pub async fn remove(&self, id: &str) {
        self.entries.write().await.remove(id);
    }

    /// Evicts devices whose `last_seen` is older than `stale_after_ms`,
    /// returning the evicted device ids.
    pub async fn evict_stale(&self, stale_after_ms: i64) -> Vec<String> {
        let now = now_unix_ms();
        let mut entries = self.entries.write().await;
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, e)| now - e.status.last_seen_unix_ms > stale_after_ms)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            entries.remove(id);
        }
        stale
    }

    pub async fn select(&self, policy: &RoutingPolicy, self_id: &str) -> SelectedDevice {
        let snapshot = self.list().await;
        select_device(&snapshot, policy, self_id)
    }
}

pub fn now_unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Pure device-selection logic, unit-testable without the registry lock.
pub fn select_device(devices: &[DeviceInfo], policy: &RoutingPolicy, self_id: &str) -> SelectedDevice {
    match policy {
        RoutingPolicy::BestAvailable => match best_available(devices) {
            Some(d) => {
                let executed_locally = d.device_id == self_id;
                SelectedDevice { device: Some(d), executed_locally, error: None }
            }
            None => SelectedDevice::err("no devices available"),
        },
        RoutingPolicy::RequireNpu => match devices.iter().find(|d| d.has_npu) {
            Some(d) => SelectedDevice {
                executed_locally: d.device_id == self_id,
                device: Some(d.clone()),
                error: None,
            },
            None => SelectedDevice::err("no device with NPU capability found"),
        },
        RoutingPolicy::PreferRemote => {
            let remote: Vec<DeviceInfo> = devices.iter().filter(|d| d.device_id != self_id).cloned().collect();
            match best_available(&remote) {
                Some(d) => SelectedDevice { device: Some(d), executed_locally: false, error: None },
                None => match devices.iter().find(|d| d.device_id == self_id) {
                    Some(d) => SelectedDevice { device: Some(d.clone()), executed_locally: true, error: None },
                    None => SelectedDevice::err("no devices available"),
                },
            }
        }
        RoutingPolicy::ForceDeviceId(id) => match devices.iter().find(|d| &d.device_id == id) {
            Some(d) => SelectedDevice {
                executed_locally: d.device_id == self_id,
                device: Some(d.clone()),
                error: None,
            },
            None => SelectedDevice::err(format!("device {id} not found")),
        },
        RoutingPolicy::RequireLocalModel => match devices.iter().find(|d| d.has_local_model) {
            Some(d) => SelectedDevice {
                executed_locally: d.device_id == self_id,
                device: Some(d.clone()),
                error: None,
            },
            None => SelectedDevice::err("no device with a local model found"),
        },
        RoutingPolicy::PreferLocalModel => {
            let with_model: Vec<DeviceInfo> = devices.iter().filter(|d| d.has_local_model).cloned().collect();
            let candidates = if with_model.is_empty() { devices.to_vec() } else { with_model };
            match best_available(&candidates) {
                Some(d) => {
                    let executed_locally = d.device_id == self_id;
                    SelectedDevice { device: Some(d), executed_locally, error: None }
                }
                None => SelectedDevice::err("no devices available"),
            }
        }
    }
}

/// Public wrapper over [`best_available`] for callers outside this module
/// that need
/// "best GPU/NPU device" without going through a [`RoutingPolicy`].
pub fn best_available_for_plan(devices: &[DeviceInfo]) -> Option<DeviceInfo> {
    best_available(devices)
}

/// NPU > GPU > CPU, ties broken by first-found.
fn best_available(devices: &[DeviceInfo]) -> Option<DeviceInfo> {
    devices
        .iter()
        .enumerate()
        .max_by_key(|(idx, d)| (capability_tier(d), std::cmp::Reverse(*idx)))
        .map(|(_, d)| d.clone())
}

/// Over the subset with `prefill_tokens_per_s > 0`, prefer NPU-capable;
/// within capability tier, highest prefill throughput.
pub fn select_best_llm_device(devices: &[DeviceInfo]) -> Option<DeviceInfo> {
    devices
        .iter()
        .filter(|d| d.is_llm_capable())
        .max_by(|a, b| {
            let tier_cmp = capability_tier(a).cmp(&capability_tier(b));
            if tier_cmp != std::cmp::Ordering::Equal {
                return tier_cmp;
            }
            a.prefill_tokens_per_s
                .partial_cmp(&b.prefill_tokens_per_s)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
}

#[path = "registry_tests.rs"]
#[cfg(test)]
mod registry_tests;
