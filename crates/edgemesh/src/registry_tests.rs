use super::*;
use crate::device::DeviceInfo;

fn device(id: &str, addr: &str) -> DeviceInfo {
    DeviceInfo {
        device_id: id.to_string(),
        name: id.to_string(),
        platform: "linux".to_string(),
        arch: "x86_64".to_string(),
        has_cpu: true,
        has_gpu: false,
        has_npu: false,
        can_screen_capture: false,
        has_local_model: false,
        local_model_name: None,
        rpc_addr: addr.to_string(),
        prefill_tokens_per_s: 0.0,
        decode_tokens_per_s: 0.0,
        ram_free_mb: None,
    }
}

#[tokio::test]
async fn upsert_is_idempotent() {
    let registry = Registry::new();
    let d = device("a", "10.0.0.1:9000");

    let first = registry.upsert(d.clone()).await.unwrap();
    let second = registry.upsert(d).await.unwrap();

    assert_eq!(registry.list().await.len(), 1);
    assert!(second >= first);
}

#[tokio::test]
async fn upsert_rejects_empty_fields() {
    let registry = Registry::new();
    let mut d = device("", "10.0.0.1:9000");
    assert!(registry.upsert(d.clone()).await.is_err());
    d.device_id = "a".to_string();
    d.rpc_addr = "".to_string();
    assert!(registry.upsert(d).await.is_err());
}

#[tokio::test]
async fn unknown_status_is_zeroed_not_error() {
    let registry = Registry::new();
    let status = registry.get_status("missing").await;
    assert_eq!(status.last_seen_unix_ms, 0);
    assert_eq!(status.cpu_load, -1.0);
}

#[tokio::test]
async fn evict_stale_removes_old_entries() {
    let registry = Registry::new();
    registry.upsert(device("a", "10.0.0.1:9000")).await.unwrap();
    let evicted = registry.evict_stale(-1).await;
    assert_eq!(evicted, vec!["a".to_string()]);
    assert!(registry.list().await.is_empty());
}

#[test]
fn select_best_available_prefers_npu_over_gpu_over_cpu() {
    let mut cpu = device("cpu", "a:1");
    let mut gpu = device("gpu", "b:1");
    gpu.has_gpu = true;
    let mut npu = device("npu", "c:1");
    npu.has_npu = true;
    cpu.has_cpu = true;

    let devices = vec![cpu, gpu, npu.clone()];
    let picked = select_device(&devices, &RoutingPolicy::BestAvailable, "self");
    assert_eq!(picked.device.unwrap().device_id, "npu");
}

#[test]
fn select_require_npu_fails_without_npu() {
    let devices = vec![device("cpu", "a:1")];
    let picked = select_device(&devices, &RoutingPolicy::RequireNpu, "self");
    assert_eq!(picked.error.as_deref(), Some("no device with NPU capability found"));
}

#[test]
fn select_prefer_remote_falls_back_to_self() {
    let devices = vec![device("self", "a:1")];
    let picked = select_device(&devices, &RoutingPolicy::PreferRemote, "self");
    assert!(picked.executed_locally);
    assert_eq!(picked.device.unwrap().device_id, "self");
}

#[test]
fn select_force_device_id_exact_match_or_fail() {
    let devices = vec![device("a", "x:1"), device("b", "y:1")];
    let picked = select_device(&devices, &RoutingPolicy::ForceDeviceId("b".to_string()), "self");
    assert_eq!(picked.device.unwrap().device_id, "b");

    let missing = select_device(&devices, &RoutingPolicy::ForceDeviceId("c".to_string()), "self");
    assert!(missing.error.is_some());
}

#[test]
fn best_llm_device_prefers_npu_then_highest_prefill() {
    let mut a = device("a", "x:1");
    a.has_npu = true;
    a.prefill_tokens_per_s = 600.0;
    let mut b = device("b", "y:1");
    b.has_gpu = true;
    b.prefill_tokens_per_s = 900.0;
    let mut c = device("c", "z:1");
    c.prefill_tokens_per_s = 0.0;

    let picked = select_best_llm_device(&[a, b, c]).unwrap();
    assert_eq!(picked.device_id, "a");
}
