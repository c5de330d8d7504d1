//! `EdgeMesh` gRPC service implementation: translates each RPC into a call
//! on the shared [`AppState`] subsystems.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::job::{Task, TaskKind};
use crate::local_exec::execute_task_locally;
use crate::state::AppState;

use super::convert::{command_result_to_proto, device_from_proto, device_to_proto, policy_from_proto, status_to_proto};
use super::proto;
use super::proto::edge_mesh_server::EdgeMesh;

pub struct EdgeMeshGrpc {
    state: Arc<AppState>,
}

impl EdgeMeshGrpc {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl EdgeMesh for EdgeMeshGrpc {
    async fn create_session(
        &self,
        request: Request<proto::CreateSessionRequest>,
    ) -> Result<Response<proto::CreateSessionResponse>, Status> {
        let req = request.into_inner();
        let info = self.state.sessions.create_session(&req.security_key, &req.device_name).await?;
        Ok(Response::new(proto::CreateSessionResponse {
            session_id: info.session_id,
            device_name: info.device_name,
            host_name: info.host_name,
            connected_at_unix_ms: info.connected_at_unix_ms,
        }))
    }

    async fn heartbeat(
        &self,
        request: Request<proto::HeartbeatRequest>,
    ) -> Result<Response<proto::HeartbeatResponse>, Status> {
        let req = request.into_inner();
        self.state.sessions.heartbeat(&req.session_id).await?;
        Ok(Response::new(proto::HeartbeatResponse { ok: true }))
    }

    async fn execute_command(
        &self,
        request: Request<proto::ExecuteCommandRequest>,
    ) -> Result<Response<proto::ExecuteCommandResponse>, Status> {
        let req = request.into_inner();
        let result = self.state.sessions.execute_command(&req.session_id, &req.command, &req.args).await?;
        Ok(Response::new(command_result_to_proto(&result)))
    }

    async fn register_device(
        &self,
        request: Request<proto::RegisterDeviceRequest>,
    ) -> Result<Response<proto::RegisterDeviceResponse>, Status> {
        let req = request.into_inner();
        let device = device_from_proto(req.device.ok_or_else(|| Status::invalid_argument("device is required"))?);
        let registered_at_unix_ms = self
            .state
            .registry
            .upsert(device)
            .await
            .map_err(Into::<Status>::into)?;
        Ok(Response::new(proto::RegisterDeviceResponse { registered_at_unix_ms }))
    }

    async fn list_devices(
        &self,
        _request: Request<proto::ListDevicesRequest>,
    ) -> Result<Response<proto::ListDevicesResponse>, Status> {
        let devices = self.state.registry.list().await;
        Ok(Response::new(proto::ListDevicesResponse { devices: devices.iter().map(device_to_proto).collect() }))
    }

    async fn get_device_status(
        &self,
        request: Request<proto::GetDeviceStatusRequest>,
    ) -> Result<Response<proto::GetDeviceStatusResponse>, Status> {
        let req = request.into_inner();
        let status = self.state.registry.get_status(&req.device_id).await;
        Ok(Response::new(proto::GetDeviceStatusResponse { status: Some(status_to_proto(&status)) }))
    }

    async fn execute_routed_command(
        &self,
        request: Request<proto::ExecuteRoutedCommandRequest>,
    ) -> Result<Response<proto::ExecuteRoutedCommandResponse>, Status> {
        let req = request.into_inner();
        let policy = policy_from_proto(req.policy);
        let result = self
            .state
            .sessions
            .execute_routed_command(&req.session_id, &policy, &req.command, &req.args)
            .await?;
        Ok(Response::new(proto::ExecuteRoutedCommandResponse {
            selected_device_id: result.selected_device_id.unwrap_or_default(),
            executed_locally: result.executed_locally,
            total_time_ms: result.total_time_ms as i64,
            output: Some(command_result_to_proto(&result.output)),
        }))
    }

    async fn run_ai_task(
        &self,
        request: Request<proto::RunAiTaskRequest>,
    ) -> Result<Response<proto::RunAiTaskResponse>, Status> {
        let req = request.into_inner();
        let advice = self.state.sessions.run_ai_task(&req.session_id, &req.task, &req.input).await?;
        Ok(Response::new(proto::RunAiTaskResponse {
            selected_device_id: advice.selected_device_id.unwrap_or_default(),
            selected_device_addr: advice.selected_device_addr.unwrap_or_default(),
            would_use_npu: advice.would_use_npu,
            result: advice.result,
        }))
    }

    async fn stream_start(
        &self,
        request: Request<proto::StreamStartRequest>,
    ) -> Result<Response<proto::StreamStartResponse>, Status> {
        let req = request.into_inner();
        let (stream_id, offer_sdp) = self
            .state
            .streams
            .start(req.target_fps.max(0) as u32, req.jpeg_quality.clamp(0, 100) as u8, req.monitor_index)
            .await
            .map_err(Into::<Status>::into)?;
        Ok(Response::new(proto::StreamStartResponse { stream_id, offer_sdp }))
    }

    async fn stream_answer(
        &self,
        request: Request<proto::StreamAnswerRequest>,
    ) -> Result<Response<proto::StreamAnswerResponse>, Status> {
        let req = request.into_inner();
        self.state.streams.answer(&req.stream_id, &req.answer_sdp).await.map_err(Into::<Status>::into)?;
        Ok(Response::new(proto::StreamAnswerResponse { ok: true }))
    }

    async fn stream_stop(
        &self,
        request: Request<proto::StreamStopRequest>,
    ) -> Result<Response<proto::StreamStopResponse>, Status> {
        let req = request.into_inner();
        self.state.streams.stop(&req.stream_id).await.map_err(Into::<Status>::into)?;
        Ok(Response::new(proto::StreamStopResponse { ok: true }))
    }

    /// Executed on a worker device when a coordinator (possibly this same
    /// node) dispatches a task to it.
    async fn submit_task(
        &self,
        request: Request<proto::SubmitTaskRequest>,
    ) -> Result<Response<proto::SubmitTaskResponse>, Status> {
        let req = request.into_inner();
        let task = Task {
            task_id: req.task_id,
            job_id: req.job_id,
            kind: task_kind_from_str(&req.kind),
            input: req.input,
            device_id: None,
            device_name: None,
            device_addr: None,
            state: crate::job::TaskState::Running,
            result: None,
            error: None,
            group_index: 0,
            prompt_tokens: (req.prompt_tokens > 0).then_some(req.prompt_tokens as u32),
            max_output_tokens: (req.max_output_tokens > 0).then_some(req.max_output_tokens as u32),
        };

        let outcome = execute_task_locally(&task, self.state.llm_client.as_ref()).await;
        Ok(Response::new(proto::SubmitTaskResponse {
            ok: outcome.ok,
            result: outcome.result.unwrap_or_default(),
            error: outcome.error.unwrap_or_default(),
        }))
    }
}

fn task_kind_from_str(s: &str) -> TaskKind {
    match s {
        "SYSINFO" => TaskKind::Sysinfo,
        "ECHO" => TaskKind::Echo,
        "LLM_GENERATE" => TaskKind::LlmGenerate,
        "IMAGE_GENERATE" => TaskKind::ImageGenerate,
        other => TaskKind::Unknown(other.to_string()),
    }
}

#[path = "service_tests.rs"]
#[cfg(test)]
mod service_tests;
