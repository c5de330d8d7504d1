use super::*;
use crate::device::DeviceInfo;
use crate::rpc_client::RpcClient;

fn device(id: &str) -> DeviceInfo {
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
        rpc_addr: format!("{id}.local:1"),
        prefill_tokens_per_s: 0.0,
        decode_tokens_per_s: 0.0,
        ram_free_mb: None,
    }
}

fn plane() -> SessionPlane {
    let registry = std::sync::Arc::new(Registry::new());
    SessionPlane::new(registry, "self".to_string(), std::sync::Arc::new(RpcClient::new()))
}

#[tokio::test]
async fn create_session_rejects_empty_security_key() {
    let plane = plane();
    let err = plane.create_session("", "laptop").await.unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::Unauthenticated);
}

#[tokio::test]
async fn create_session_then_heartbeat_succeeds() {
    let plane = plane();
    let info = plane.create_session("k", "laptop").await.unwrap();
    assert!(plane.heartbeat(&info.session_id).await.is_ok());
}

#[tokio::test]
async fn heartbeat_on_unknown_session_is_not_found() {
    let plane = plane();
    let err = plane.heartbeat("nope").await.unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::NotFound);
}

#[tokio::test]
async fn execute_command_requires_a_live_session() {
    let plane = plane();
    let err = plane.execute_command("nope", "pwd", &[]).await.unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::NotFound);
}

#[tokio::test]
async fn execute_command_runs_an_allowlisted_command() {
    let plane = plane();
    let info = plane.create_session("k", "laptop").await.unwrap();
    let result = plane.execute_command(&info.session_id, "pwd", &[]).await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(!result.stdout.trim().is_empty());
}

#[tokio::test]
async fn execute_command_rejects_disallowed_command() {
    let plane = plane();
    let info = plane.create_session("k", "laptop").await.unwrap();
    let err = plane.execute_command(&info.session_id, "rm", &["-rf".to_string()]).await.unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::PolicyRejected);
}

#[tokio::test]
async fn routed_command_executes_locally_when_self_is_selected() {
    let registry = std::sync::Arc::new(Registry::new());
    registry.upsert(device("self")).await.unwrap();
    let plane = SessionPlane::new(std::sync::Arc::clone(&registry), "self".to_string(), std::sync::Arc::new(RpcClient::new()));

    let info = plane.create_session("k", "laptop").await.unwrap();
    let result = plane
        .execute_routed_command(&info.session_id, &RoutingPolicy::ForceDeviceId("self".to_string()), "pwd", &[])
        .await
        .unwrap();

    assert!(result.executed_locally);
    assert_eq!(result.selected_device_id.as_deref(), Some("self"));
    assert_eq!(result.output.exit_code, 0);
}

#[tokio::test]
async fn routed_command_with_no_devices_is_policy_rejected() {
    let plane = plane();
    let info = plane.create_session("k", "laptop").await.unwrap();
    let err = plane
        .execute_routed_command(&info.session_id, &RoutingPolicy::BestAvailable, "pwd", &[])
        .await
        .unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::PolicyRejected);
}

#[tokio::test]
async fn run_ai_task_is_advisory_only() {
    let registry = std::sync::Arc::new(Registry::new());
    let mut npu_device = device("npu-1");
    npu_device.has_npu = true;
    npu_device.prefill_tokens_per_s = 100.0;
    registry.upsert(npu_device).await.unwrap();
    let plane = SessionPlane::new(std::sync::Arc::clone(&registry), "self".to_string(), std::sync::Arc::new(RpcClient::new()));

    let info = plane.create_session("k", "laptop").await.unwrap();
    let advice = plane.run_ai_task(&info.session_id, "chat", "hello").await.unwrap();

    assert_eq!(advice.selected_device_id.as_deref(), Some("npu-1"));
    assert!(advice.would_use_npu);
}
