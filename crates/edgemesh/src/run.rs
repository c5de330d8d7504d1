//! Top-level wiring: constructs every subsystem, registers this node in
//! its own registry, and serves the gRPC and HTTP surfaces concurrently
//! until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{load_or_create_device_id, Config};
use crate::device::DeviceInfo;
use crate::discovery::Discovery;
use crate::job::manager::JobManager;
use crate::llm::{LlmClient, LlmConfig};
use crate::metrics::MetricsStore;
use crate::registry::Registry;
use crate::rpc_client::{RpcClient, RpcTaskRunner};
use crate::session::SessionPlane;
use crate::state::AppState;
use crate::stream::capture::ScreenCapture;
use crate::stream::StreamManager;
use crate::tickets::TicketManager;
use crate::transport::grpc::proto::edge_mesh_server::EdgeMeshServer;
use crate::transport::grpc::EdgeMeshGrpc;
use crate::transport::http::build_router;

const METRICS_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Runs the `edgemesh` node until its shutdown token fires.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let shutdown = CancellationToken::new();

    let device_id = load_or_create_device_id()?;
    let registry = Arc::new(Registry::new());
    let rpc_client = Arc::new(RpcClient::new());

    let llm_client = match (&config.llm_base_url, &config.llm_model) {
        (Some(base_url), Some(model)) => Some(Arc::new(LlmClient::new(LlmConfig {
            base_url: base_url.clone(),
            model: model.clone(),
            api_key: config.llm_api_key.clone(),
        }))),
        _ => None,
    };

    let runner = Arc::new(RpcTaskRunner::new(config.grpc_addr.clone(), Arc::clone(&rpc_client), llm_client.clone()));
    let jobs = Arc::new(JobManager::new(runner, llm_client.clone(), config.use_llm_planner));
    let tickets = Arc::new(TicketManager::default());
    let metrics = Arc::new(MetricsStore::new());
    let sessions = Arc::new(SessionPlane::new(Arc::clone(&registry), device_id.clone(), Arc::clone(&rpc_client)));

    let capture: Arc<dyn ScreenCapture> = unavailable_capture();
    let streams = Arc::new(StreamManager::new(capture));

    let self_device = build_self_device(&device_id, &config.grpc_addr);
    registry.upsert(self_device.clone()).await?;

    let internal_session = sessions.create_session("internal", "edgemesh-http").await?;

    let state = Arc::new(AppState {
        config: config.clone(),
        self_device_id: device_id.clone(),
        registry: Arc::clone(&registry),
        jobs,
        tickets,
        metrics: Arc::clone(&metrics),
        sessions: Arc::clone(&sessions),
        streams,
        rpc_client,
        llm_client,
        shutdown: shutdown.clone(),
        internal_session_id: internal_session.session_id,
    });

    let discovery = Arc::new(
        Discovery::bind(
            config.disc_port,
            Arc::clone(&registry),
            self_device,
            config.seed_peers.clone(),
            Duration::from_secs(config.announce_interval_secs),
            None,
        )
        .await?,
    );
    discovery.spawn(config.disc_port, shutdown.clone());

    spawn_metrics_cleanup(Arc::clone(&metrics), shutdown.clone());

    let grpc_addr: std::net::SocketAddr = config.grpc_addr.parse()?;
    let grpc_server = EdgeMeshServer::new(EdgeMeshGrpc::new(Arc::clone(&state)));
    let grpc_shutdown = shutdown.clone();
    let grpc_task = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(grpc_server)
            .serve_with_shutdown(grpc_addr, grpc_shutdown.cancelled_owned())
            .await
    });

    let http_listener = TcpListener::bind(&config.http_addr).await?;
    let http_router = build_router(Arc::clone(&state));
    let http_shutdown = shutdown.clone();
    let http_task = tokio::spawn(async move {
        axum::serve(http_listener, http_router).with_graceful_shutdown(http_shutdown.cancelled_owned()).await
    });

    info!(grpc_addr = %config.grpc_addr, http_addr = %config.http_addr, device_id = %device_id, "edgemesh node listening");

    let (grpc_result, http_result) = tokio::join!(grpc_task, http_task);
    grpc_result??;
    http_result??;

    Ok(())
}

fn build_self_device(device_id: &str, grpc_addr: &str) -> DeviceInfo {
    let port = grpc_addr.rsplit_once(':').map(|(_, p)| p).unwrap_or("50051");
    let host = local_lan_ip().unwrap_or_else(|| "127.0.0.1".to_string());
    DeviceInfo {
        device_id: device_id.to_string(),
        name: crate::session::hostname_for_display(),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        has_cpu: true,
        has_gpu: false,
        has_npu: false,
        can_screen_capture: false,
        has_local_model: false,
        local_model_name: None,
        rpc_addr: format!("{host}:{port}"),
        prefill_tokens_per_s: 0.0,
        decode_tokens_per_s: 0.0,
        ram_free_mb: None,
    }
}

/// First UP, non-loopback IPv4 address on this host, for self-advertisement
/// over discovery.
fn local_lan_ip() -> Option<String> {
    for iface in netdev::get_interfaces() {
        if !iface.is_up() || iface.is_loopback() {
            continue;
        }
        if let Some(net) = iface.ipv4.first() {
            return Some(net.addr().to_string());
        }
    }
    None
}

fn unavailable_capture() -> Arc<dyn ScreenCapture> {
    Arc::new(crate::stream::capture::UnavailableCapture)
}

fn spawn_metrics_cleanup(metrics: Arc<MetricsStore>, token: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(METRICS_CLEANUP_INTERVAL);
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => {
                    metrics.cleanup().await;
                }
            }
        }
    });
}
