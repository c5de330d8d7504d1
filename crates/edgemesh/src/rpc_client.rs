//! Outbound gRPC client used to dial peer devices for remote task and
//! command execution. The generated `EdgeMesh` client is the
//! same contract every node serves, so dialing a peer looks exactly like a
//! caller dialing this node.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tonic::transport::Channel;
use tonic::Request;

use crate::error::DomainError;
use crate::job::manager::{TaskOutcome, TaskRunner};
use crate::job::Task;
use crate::llm::LlmClient;
use crate::local_exec::execute_task_locally;
use crate::session::CommandResult;
use crate::transport::grpc::proto::edge_mesh_client::EdgeMeshClient;
use crate::transport::grpc::proto::{ExecuteCommandRequest, SubmitTaskRequest};

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
const CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// One lazily-connected, cached channel per peer address.
pub struct RpcClient {
    channels: Mutex<std::collections::HashMap<String, Channel>>,
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcClient {
    pub fn new() -> Self {
        Self { channels: Mutex::new(std::collections::HashMap::new()) }
    }

    async fn dial(&self, addr: &str) -> Result<Channel, DomainError> {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(addr) {
            return Ok(channel.clone());
        }
        let endpoint = Channel::from_shared(format!("http://{addr}"))
            .map_err(|e| DomainError::internal(format!("invalid peer address {addr}: {e}")))?
            .connect_timeout(DIAL_TIMEOUT);
        let channel = tokio::time::timeout(DIAL_TIMEOUT, endpoint.connect())
            .await
            .map_err(|_| DomainError::timeout(format!("dialing {addr} timed out")))?
            .map_err(|e| DomainError::internal(format!("failed to dial {addr}: {e}")))?;
        channels.insert(addr.to_string(), channel.clone());
        Ok(channel)
    }

    /// Forwards a single task to the remote device's `SubmitTask` RPC.
    pub async fn submit_task_remote(&self, addr: &str, task: &Task) -> TaskOutcome {
        match self.try_submit_task_remote(addr, task).await {
            Ok(outcome) => outcome,
            Err(e) => TaskOutcome { ok: false, result: None, error: Some(e.message) },
        }
    }

    async fn try_submit_task_remote(&self, addr: &str, task: &Task) -> Result<TaskOutcome, DomainError> {
        let channel = self.dial(addr).await?;
        let mut client = EdgeMeshClient::new(channel);

        let request = Request::new(SubmitTaskRequest {
            task_id: task.task_id.clone(),
            job_id: task.job_id.clone(),
            kind: task.kind.as_str().to_string(),
            input: task.input.clone(),
            prompt_tokens: task.prompt_tokens.unwrap_or(0) as i32,
            max_output_tokens: task.max_output_tokens.unwrap_or(0) as i32,
        });

        let response = tokio::time::timeout(CALL_TIMEOUT, client.submit_task(request))
            .await
            .map_err(|_| DomainError::timeout(format!("SubmitTask to {addr} timed out")))?
            .map_err(|status| DomainError::internal(format!("SubmitTask to {addr} failed: {status}")))?
            .into_inner();

        Ok(TaskOutcome {
            ok: response.ok,
            result: response.ok.then_some(response.result),
            error: (!response.ok).then_some(response.error),
        })
    }

    /// Forwards an allowlisted command to the remote device's
    /// `ExecuteCommand` RPC.
    pub async fn execute_command_remote(
        &self,
        addr: &str,
        session_id: &str,
        command: &str,
        args: &[String],
    ) -> Result<CommandResult, DomainError> {
        let channel = self.dial(addr).await?;
        let mut client = EdgeMeshClient::new(channel);

        let request = Request::new(ExecuteCommandRequest {
            session_id: session_id.to_string(),
            command: command.to_string(),
            args: args.to_vec(),
        });

        let response = tokio::time::timeout(CALL_TIMEOUT, client.execute_command(request))
            .await
            .map_err(|_| DomainError::timeout(format!("ExecuteCommand to {addr} timed out")))?
            .map_err(|status| DomainError::internal(format!("ExecuteCommand to {addr} failed: {status}")))?
            .into_inner();

        Ok(CommandResult { exit_code: response.exit_code, stdout: response.stdout, stderr: response.stderr })
    }
}

/// Production [`TaskRunner`]: runs a task locally when it targets this
/// node's own address, otherwise dials the remote device and forwards it
/// via `SubmitTask`.
pub struct RpcTaskRunner {
    self_addr: String,
    client: Arc<RpcClient>,
    llm_client: Option<Arc<LlmClient>>,
}

impl RpcTaskRunner {
    pub fn new(self_addr: String, client: Arc<RpcClient>, llm_client: Option<Arc<LlmClient>>) -> Self {
        Self { self_addr, client, llm_client }
    }
}

#[async_trait]
impl TaskRunner for RpcTaskRunner {
    async fn run_task(&self, device_addr: &str, task: &Task) -> TaskOutcome {
        if device_addr.is_empty() || device_addr == self.self_addr {
            execute_task_locally(task, self.llm_client.as_ref()).await
        } else {
            self.client.submit_task_remote(device_addr, task).await
        }
    }
}
