//! Domain ⇄ proto conversions for the `EdgeMesh` RPC service.

use crate::device::{DeviceInfo, DeviceStatus, RoutingPolicy};
use crate::session::CommandResult;

use super::proto;

pub fn device_to_proto(d: &DeviceInfo) -> proto::DeviceInfo {
    proto::DeviceInfo {
        device_id: d.device_id.clone(),
        name: d.name.clone(),
        platform: d.platform.clone(),
        arch: d.arch.clone(),
        has_cpu: d.has_cpu,
        has_gpu: d.has_gpu,
        has_npu: d.has_npu,
        can_screen_capture: d.can_screen_capture,
        has_local_model: d.has_local_model,
        local_model_name: d.local_model_name.clone().unwrap_or_default(),
        rpc_addr: d.rpc_addr.clone(),
        prefill_tokens_per_s: d.prefill_tokens_per_s,
        decode_tokens_per_s: d.decode_tokens_per_s,
        ram_free_mb: d.ram_free_mb.unwrap_or(0),
    }
}

pub fn device_from_proto(d: proto::DeviceInfo) -> DeviceInfo {
    DeviceInfo {
        device_id: d.device_id,
        name: d.name,
        platform: d.platform,
        arch: d.arch,
        has_cpu: d.has_cpu,
        has_gpu: d.has_gpu,
        has_npu: d.has_npu,
        can_screen_capture: d.can_screen_capture,
        has_local_model: d.has_local_model,
        local_model_name: (!d.local_model_name.is_empty()).then_some(d.local_model_name),
        rpc_addr: d.rpc_addr,
        prefill_tokens_per_s: d.prefill_tokens_per_s,
        decode_tokens_per_s: d.decode_tokens_per_s,
        ram_free_mb: (d.ram_free_mb != 0).then_some(d.ram_free_mb),
    }
}

pub fn status_to_proto(s: &DeviceStatus) -> proto::DeviceStatus {
    proto::DeviceStatus {
        device_id: s.device_id.clone(),
        last_seen_unix_ms: s.last_seen_unix_ms,
        cpu_load: s.cpu_load,
        mem_used_mb: s.mem_used_mb,
        mem_total_mb: s.mem_total_mb,
        gpu_load: s.gpu_load.unwrap_or(-1.0),
        gpu_mem_used_mb: s.gpu_mem_used_mb.unwrap_or(0),
        gpu_mem_total_mb: s.gpu_mem_total_mb.unwrap_or(0),
        npu_load: s.npu_load.unwrap_or(-1.0),
    }
}

pub fn policy_from_proto(p: Option<proto::RoutingPolicy>) -> RoutingPolicy {
    match p {
        None => RoutingPolicy::BestAvailable,
        Some(p) => match p.mode.as_str() {
            "REQUIRE_NPU" => RoutingPolicy::RequireNpu,
            "PREFER_REMOTE" => RoutingPolicy::PreferRemote,
            "FORCE_DEVICE_ID" => RoutingPolicy::ForceDeviceId(p.device_id),
            "REQUIRE_LOCAL_MODEL" => RoutingPolicy::RequireLocalModel,
            "PREFER_LOCAL_MODEL" => RoutingPolicy::PreferLocalModel,
            _ => RoutingPolicy::BestAvailable,
        },
    }
}

pub fn command_result_to_proto(r: &CommandResult) -> proto::ExecuteCommandResponse {
    proto::ExecuteCommandResponse { exit_code: r.exit_code, stdout: r.stdout.clone(), stderr: r.stderr.clone() }
}
