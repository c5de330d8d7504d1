//! Predicts plan latency/memory per candidate device.

use serde::{Deserialize, Serialize};

use crate::device::DeviceInfo;
use crate::job::{Plan, TaskKind, TaskSpec};

const DEFAULT_LLM_MEMORY_MB: f64 = 2048.0;
const SYSINFO_ECHO_LATENCY_MS: f64 = 10.0;
const UNKNOWN_KIND_PENALTY_MS: f64 = 250.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCost {
    pub task_kind: String,
    pub latency_ms: f64,
    pub memory_mb: f64,
    pub unknown_cost: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCost {
    pub device_id: String,
    pub steps: Vec<StepCost>,
    pub total_latency_ms: f64,
    pub peak_memory_mb: f64,
    pub ram_sufficient: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub device_costs: Vec<DeviceCost>,
    pub recommended_device_id: Option<String>,
    pub estimated_latency_ms: f64,
    pub estimated_memory_mb: f64,
    pub has_unknown_costs: bool,
    pub warning: Option<String>,
}

fn platform_defaults(platform: &str) -> (f64, f64) {
    match platform {
        "android" | "ios" => (120.0, 12.0),
        _ => (300.0, 30.0),
    }
}

fn step_cost(task: &TaskSpec, device: &DeviceInfo) -> StepCost {
    match task.kind {
        TaskKind::LlmGenerate => {
            let (default_prefill, default_decode) = platform_defaults(&device.platform);
            let prefill = if device.prefill_tokens_per_s > 0.0 { device.prefill_tokens_per_s } else { default_prefill };
            let decode = if device.decode_tokens_per_s > 0.0 { device.decode_tokens_per_s } else { default_decode };
            let prompt_tokens = task.prompt_tokens.unwrap_or(0) as f64;
            let max_output_tokens = task.max_output_tokens.unwrap_or(0) as f64;
            let latency_ms = (prompt_tokens / prefill + max_output_tokens / decode) * 1000.0;
            StepCost {
                task_kind: "LLM_GENERATE".to_string(),
                latency_ms,
                memory_mb: DEFAULT_LLM_MEMORY_MB,
                unknown_cost: false,
            }
        }
        TaskKind::Sysinfo => StepCost {
            task_kind: "SYSINFO".to_string(),
            latency_ms: SYSINFO_ECHO_LATENCY_MS,
            memory_mb: 0.0,
            unknown_cost: false,
        },
        TaskKind::Echo => StepCost {
            task_kind: "ECHO".to_string(),
            latency_ms: SYSINFO_ECHO_LATENCY_MS,
            memory_mb: 0.0,
            unknown_cost: false,
        },
        TaskKind::ImageGenerate => StepCost {
            task_kind: "IMAGE_GENERATE".to_string(),
            latency_ms: UNKNOWN_KIND_PENALTY_MS,
            memory_mb: 0.0,
            unknown_cost: true,
        },
        TaskKind::Unknown(ref kind) => StepCost {
            task_kind: kind.clone(),
            latency_ms: UNKNOWN_KIND_PENALTY_MS,
            memory_mb: 0.0,
            unknown_cost: true,
        },
    }
}

fn estimate_for_device(plan: &Plan, device: &DeviceInfo) -> DeviceCost {
    let mut steps = Vec::new();
    let mut total_latency_ms = 0.0;
    let mut peak_memory_mb: f64 = 0.0;

    for group in &plan.groups {
        let mut group_latency: f64 = 0.0;
        let mut group_peak_memory: f64 = 0.0;
        for task in &group.tasks {
            let cost = step_cost(task, device);
            group_latency = group_latency.max(cost.latency_ms);
            group_peak_memory = group_peak_memory.max(cost.memory_mb);
            steps.push(cost);
        }
        total_latency_ms += group_latency;
        peak_memory_mb = peak_memory_mb.max(group_peak_memory);
    }

    let ram_sufficient = match device.ram_free_mb {
        Some(free) if free > 0 => peak_memory_mb <= free as f64,
        _ => true,
    };

    DeviceCost {
        device_id: device.device_id.clone(),
        steps,
        total_latency_ms,
        peak_memory_mb,
        ram_sufficient,
    }
}

/// Empty plan -> zero latency; nil plan or empty device list -> warning,
/// no device picked.
pub fn estimate_cost(plan: Option<&Plan>, devices: &[DeviceInfo]) -> CostEstimate {
    let plan = match plan {
        Some(p) => p,
        None => {
            return CostEstimate {
                device_costs: vec![],
                recommended_device_id: None,
                estimated_latency_ms: 0.0,
                estimated_memory_mb: 0.0,
                has_unknown_costs: false,
                warning: Some("no plan supplied".to_string()),
            };
        }
    };

    if devices.is_empty() {
        return CostEstimate {
            device_costs: vec![],
            recommended_device_id: None,
            estimated_latency_ms: 0.0,
            estimated_memory_mb: 0.0,
            has_unknown_costs: false,
            warning: Some("no candidate devices supplied".to_string()),
        };
    }

    let device_costs: Vec<DeviceCost> = devices.iter().map(|d| estimate_for_device(plan, d)).collect();
    let has_unknown_costs = device_costs.iter().any(|dc| dc.steps.iter().any(|s| s.unknown_cost));

    let recommended = device_costs
        .iter()
        .min_by(|a, b| a.total_latency_ms.partial_cmp(&b.total_latency_ms).unwrap_or(std::cmp::Ordering::Equal));

    let (estimated_latency_ms, estimated_memory_mb, recommended_device_id) = match recommended {
        Some(dc) => (dc.total_latency_ms, dc.peak_memory_mb, Some(dc.device_id.clone())),
        None => (0.0, 0.0, None),
    };

    CostEstimate {
        device_costs,
        recommended_device_id,
        estimated_latency_ms,
        estimated_memory_mb,
        has_unknown_costs,
        warning: if has_unknown_costs { Some("plan contains task kinds with no known cost model".to_string()) } else { None },
    }
}

#[path = "cost_tests.rs"]
#[cfg(test)]
mod cost_tests;
