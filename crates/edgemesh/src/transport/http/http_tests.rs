use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::device::DeviceInfo;
use crate::job::manager::{JobManager, TaskOutcome, TaskRunner};
use crate::metrics::MetricsStore;
use crate::registry::Registry;
use crate::rpc_client::RpcClient;
use crate::session::SessionPlane;
use crate::state::AppState;
use crate::stream::capture::UnavailableCapture;
use crate::stream::StreamManager;
use crate::tickets::TicketManager;

struct EchoRunner;

#[async_trait]
impl TaskRunner for EchoRunner {
    async fn run_task(&self, _device_addr: &str, task: &crate::job::Task) -> TaskOutcome {
        TaskOutcome { ok: true, result: Some(format!("ok:{}", task.input)), error: None }
    }
}

async fn test_server() -> (TestServer, Arc<AppState>) {
    let registry = Arc::new(Registry::new());
    let rpc_client = Arc::new(RpcClient::new());
    let jobs = Arc::new(JobManager::new(Arc::new(EchoRunner), None, false));
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

    let server = TestServer::new(super::build_router(Arc::clone(&state))).expect("test server should build");
    (server, state)
}

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
        rpc_addr: format!("{id}:1"),
        prefill_tokens_per_s: 0.0,
        decode_tokens_per_s: 0.0,
        ram_free_mb: None,
    }
}

/// GET /api/devices reflects the registry's current contents.
#[tokio::test]
async fn devices_endpoint_reflects_the_registry() -> anyhow::Result<()> {
    let (server, state) = test_server().await;
    state.registry.upsert(device("a")).await?;

    let resp = server.get("/api/devices").await;
    resp.assert_status_ok();
    let body: serde_json::Value = serde_json::from_str(&resp.text())?;
    assert_eq!(body["devices"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["devices"][0]["device_id"], "a");
    Ok(())
}

/// A job submitted over HTTP runs to completion and its per-task detail
/// is visible through /api/job-detail.
#[tokio::test]
async fn submit_job_then_job_detail_round_trips_to_done() -> anyhow::Result<()> {
    let (server, state) = test_server().await;
    state.registry.upsert(device("a")).await?;

    let submitted = server.post("/api/submit-job").json(&serde_json::json!({ "text": "status" })).await;
    submitted.assert_status_ok();
    let job_id = serde_json::from_str::<serde_json::Value>(&submitted.text())?["job_id"].as_str().unwrap().to_string();
    assert!(!job_id.is_empty());

    let mut body = serde_json::Value::Null;
    for _ in 0..200 {
        let resp = server.get(&format!("/api/job-detail?id={job_id}")).await;
        body = serde_json::from_str(&resp.text())?;
        if matches!(body["state"].as_str(), Some("DONE") | Some("FAILED")) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(body["state"], "DONE");
    assert_eq!(body["final_result"], "ok:status");
    assert_eq!(body["tasks"].as_array().map(Vec::len), Some(1));
    Ok(())
}

/// Estimating cost against an empty device catalog carries a warning and
/// no per-device breakdown, rather than a spurious zero-cost estimate.
#[tokio::test]
async fn plan_cost_reports_a_warning_for_an_empty_device_list() -> anyhow::Result<()> {
    let (server, _state) = test_server().await;
    let resp = server.post("/api/plan-cost").json(&serde_json::json!({ "text": "summarize this" })).await;
    resp.assert_status_ok();
    let body: serde_json::Value = serde_json::from_str(&resp.text())?;
    assert!(body["warning"].is_string());
    assert_eq!(body["device_costs"].as_array().map(Vec::len), Some(0));
    Ok(())
}

/// A download ticket is consumed on first use and a second redemption of
/// the same token 404s rather than serving the file again.
#[tokio::test]
async fn download_ticket_is_single_use() -> anyhow::Result<()> {
    let (server, _state) = test_server().await;
    let file = tempfile::NamedTempFile::new()?;
    std::fs::write(file.path(), b"hello world")?;

    let issued = server.post("/api/request-download").json(&serde_json::json!({ "path": file.path() })).await;
    issued.assert_status_ok();
    let issued: serde_json::Value = serde_json::from_str(&issued.text())?;
    assert_eq!(issued["size_bytes"], 11);

    let download_url = issued["download_url"].as_str().expect("download_url is a string");
    let token = download_url.rsplit_once("token=").map(|(_, t)| t).expect("download_url carries a token");

    let first = server.get(&format!("/api/download?token={token}")).await;
    first.assert_status_ok();
    assert_eq!(first.as_bytes(), b"hello world");

    let second = server.get(&format!("/api/download?token={token}")).await;
    second.assert_status_not_found();
    Ok(())
}
