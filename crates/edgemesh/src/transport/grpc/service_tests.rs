use super::*;

use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::job::manager::{JobManager, TaskOutcome, TaskRunner};
use crate::metrics::MetricsStore;
use crate::registry::Registry;
use crate::rpc_client::RpcClient;
use crate::session::SessionPlane;
use crate::stream::capture::UnavailableCapture;
use crate::stream::StreamManager;
use crate::tickets::TicketManager;

struct NoopRunner;

#[async_trait]
impl TaskRunner for NoopRunner {
    async fn run_task(&self, _device_addr: &str, _task: &crate::job::Task) -> TaskOutcome {
        TaskOutcome { ok: false, result: None, error: Some("not wired in this fixture".to_string()) }
    }
}

async fn test_service() -> EdgeMeshGrpc {
    let registry = Arc::new(Registry::new());
    let rpc_client = Arc::new(RpcClient::new());
    let jobs = Arc::new(JobManager::new(Arc::new(NoopRunner), None, false));
    let tickets = Arc::new(TicketManager::default());
    let metrics = Arc::new(MetricsStore::new());
    let sessions = Arc::new(SessionPlane::new(Arc::clone(&registry), "self".to_string(), Arc::clone(&rpc_client)));
    let streams = Arc::new(StreamManager::new(Arc::new(UnavailableCapture)));
    let internal = sessions.create_session("internal", "test-harness").await.expect("internal session");

    let state = Arc::new(AppState {
        config: Config::parse_from(["edgemesh"]),
        self_device_id: "self".to_string(),
        registry,
        jobs,
        tickets,
        metrics,
        sessions,
        streams,
        rpc_client,
        llm_client: None,
        shutdown: CancellationToken::new(),
        internal_session_id: internal.session_id,
    });

    EdgeMeshGrpc::new(state)
}

fn device(id: &str) -> proto::DeviceInfo {
    proto::DeviceInfo {
        device_id: id.to_string(),
        name: id.to_string(),
        platform: "linux".to_string(),
        arch: "x86_64".to_string(),
        has_cpu: true,
        has_gpu: false,
        has_npu: false,
        can_screen_capture: false,
        has_local_model: false,
        local_model_name: String::new(),
        rpc_addr: format!("{id}:1"),
        prefill_tokens_per_s: 0.0,
        decode_tokens_per_s: 0.0,
        ram_free_mb: 0,
    }
}

#[tokio::test]
async fn create_session_rejects_empty_key() {
    let svc = test_service().await;
    let err = svc
        .create_session(Request::new(proto::CreateSessionRequest { security_key: String::new(), device_name: "x".to_string() }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::Unauthenticated);
}

#[tokio::test]
async fn create_session_then_heartbeat_succeeds() {
    let svc = test_service().await;
    let session = svc
        .create_session(Request::new(proto::CreateSessionRequest {
            security_key: "secret".to_string(),
            device_name: "phone".to_string(),
        }))
        .await
        .expect("create_session should succeed")
        .into_inner();
    assert!(!session.session_id.is_empty());

    svc.heartbeat(Request::new(proto::HeartbeatRequest { session_id: session.session_id }))
        .await
        .expect("heartbeat on a live session should succeed");
}

#[tokio::test]
async fn heartbeat_on_unknown_session_is_not_found() {
    let svc = test_service().await;
    let err = svc.heartbeat(Request::new(proto::HeartbeatRequest { session_id: "nope".to_string() })).await.unwrap_err();
    assert_eq!(err.code(), tonic::Code::NotFound);
}

#[tokio::test]
async fn register_device_then_list_devices_roundtrips() {
    let svc = test_service().await;
    svc.register_device(Request::new(proto::RegisterDeviceRequest { device: Some(device("worker-1")) }))
        .await
        .expect("register_device should succeed");

    let listed = svc.list_devices(Request::new(proto::ListDevicesRequest {})).await.expect("list_devices should succeed").into_inner();
    assert_eq!(listed.devices.len(), 1);
    assert_eq!(listed.devices[0].device_id, "worker-1");
}

#[tokio::test]
async fn execute_command_runs_an_allowlisted_command() {
    let svc = test_service().await;
    let session = svc
        .create_session(Request::new(proto::CreateSessionRequest { security_key: "secret".to_string(), device_name: "x".to_string() }))
        .await
        .expect("create_session should succeed")
        .into_inner();

    let result = svc
        .execute_command(Request::new(proto::ExecuteCommandRequest {
            session_id: session.session_id,
            command: "pwd".to_string(),
            args: vec![],
        }))
        .await
        .expect("pwd is allowlisted")
        .into_inner();

    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn execute_command_rejects_disallowed_command() {
    let svc = test_service().await;
    let session = svc
        .create_session(Request::new(proto::CreateSessionRequest { security_key: "secret".to_string(), device_name: "x".to_string() }))
        .await
        .expect("create_session should succeed")
        .into_inner();

    let err = svc
        .execute_command(Request::new(proto::ExecuteCommandRequest {
            session_id: session.session_id,
            command: "rm".to_string(),
            args: vec!["-rf".to_string(), "/".to_string()],
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::FailedPrecondition);
}

#[tokio::test]
async fn submit_task_executes_sysinfo_locally() {
    let svc = test_service().await;
    let response = svc
        .submit_task(Request::new(proto::SubmitTaskRequest {
            task_id: "t1".to_string(),
            job_id: "j1".to_string(),
            kind: "SYSINFO".to_string(),
            input: String::new(),
            prompt_tokens: 0,
            max_output_tokens: 0,
        }))
        .await
        .expect("sysinfo should execute locally")
        .into_inner();

    assert!(response.ok);
    assert!(response.result.contains("platform="));
}

#[tokio::test]
async fn submit_task_fails_for_unconfigured_llm() {
    let svc = test_service().await;
    let response = svc
        .submit_task(Request::new(proto::SubmitTaskRequest {
            task_id: "t1".to_string(),
            job_id: "j1".to_string(),
            kind: "LLM_GENERATE".to_string(),
            input: "hello".to_string(),
            prompt_tokens: 10,
            max_output_tokens: 10,
        }))
        .await
        .expect("the RPC call itself should still succeed")
        .into_inner();

    assert!(!response.ok);
    assert!(!response.error.is_empty());
}

#[tokio::test]
async fn run_ai_task_is_advisory_and_does_not_require_a_device() {
    let svc = test_service().await;
    let session = svc
        .create_session(Request::new(proto::CreateSessionRequest { security_key: "secret".to_string(), device_name: "x".to_string() }))
        .await
        .expect("create_session should succeed")
        .into_inner();

    let advice = svc
        .run_ai_task(Request::new(proto::RunAiTaskRequest {
            session_id: session.session_id,
            task: "summarize".to_string(),
            input: "hello".to_string(),
        }))
        .await
        .expect("run_ai_task should succeed even with no LLM-capable devices")
        .into_inner();

    assert!(!advice.would_use_npu);
    assert!(advice.selected_device_id.is_empty());
}

#[tokio::test]
async fn stream_lifecycle_start_answer_stop() {
    let svc = test_service().await;
    let started = svc
        .stream_start(Request::new(proto::StreamStartRequest { target_fps: 8, jpeg_quality: 60, monitor_index: 0 }))
        .await
        .expect("stream_start should succeed")
        .into_inner();
    assert!(!started.stream_id.is_empty());

    let stop_err = svc.stream_stop(Request::new(proto::StreamStopRequest { stream_id: "unknown".to_string() })).await.unwrap_err();
    assert_eq!(stop_err.code(), tonic::Code::NotFound);

    svc.stream_stop(Request::new(proto::StreamStopRequest { stream_id: started.stream_id })).await.expect("stop should succeed");
}
