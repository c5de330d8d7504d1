//! Shared application state passed to every transport handler.
//!
//! Organized into focused sub-systems by concern: registry, job manager,
//! ticket manager, metrics store. Each owns its own lock, and no handler
//! acquires two of these locks nested inside one another.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::device::DeviceInfo;
use crate::job::manager::JobManager;
use crate::llm::LlmClient;
use crate::metrics::MetricsStore;
use crate::registry::Registry;
use crate::rpc_client::RpcClient;
use crate::session::SessionPlane;
use crate::stream::StreamManager;
use crate::tickets::TicketManager;

/// Shared state bundle handed to gRPC and HTTP handlers alike via `Arc`.
pub struct AppState {
    pub config: Config,
    pub self_device_id: String,
    pub registry: Arc<Registry>,
    pub jobs: Arc<JobManager>,
    pub tickets: Arc<TicketManager>,
    pub metrics: Arc<MetricsStore>,
    pub sessions: Arc<SessionPlane>,
    pub streams: Arc<StreamManager>,
    pub rpc_client: Arc<RpcClient>,
    pub llm_client: Option<Arc<LlmClient>>,
    pub shutdown: CancellationToken,
    /// Session id used to authenticate HTTP-originated session-plane calls,
    /// whose wire format carries no `session_id`.
    pub internal_session_id: String,
}

impl AppState {
    /// Returns this node's own `DeviceInfo` if it has registered itself
    /// in the registry (it always has, by the time `run` finishes wiring).
    pub async fn self_device(&self) -> Option<DeviceInfo> {
        self.registry.get(&self.self_device_id).await
    }
}
