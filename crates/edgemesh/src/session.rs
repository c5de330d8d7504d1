//! Session authentication, local/routed command execution, and advisory
//! AI-task routing.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::allowlist::validate_command;
use crate::device::RoutingPolicy;
use crate::error::DomainError;
use crate::registry::{now_unix_ms, select_best_llm_device, Registry};
use crate::rpc_client::RpcClient;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);
const OUTPUT_CAP_BYTES: usize = 1024 * 1024; // 1 MiB per stream

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub device_name: String,
    pub host_name: String,
    pub connected_at_unix_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedCommandResult {
    pub selected_device_id: Option<String>,
    pub executed_locally: bool,
    pub total_time_ms: u64,
    pub output: CommandResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiTaskAdvice {
    pub selected_device_id: Option<String>,
    pub selected_device_addr: Option<String>,
    pub would_use_npu: bool,
    pub result: String,
}

pub struct SessionPlane {
    sessions: RwLock<HashMap<String, SessionInfo>>,
    registry: std::sync::Arc<Registry>,
    self_id: String,
    host_name: String,
    rpc_client: std::sync::Arc<RpcClient>,
}

impl SessionPlane {
    pub fn new(registry: std::sync::Arc<Registry>, self_id: String, rpc_client: std::sync::Arc<RpcClient>) -> Self {
        let host_name = hostname();
        Self { sessions: RwLock::new(HashMap::new()), registry, self_id, host_name, rpc_client }
    }

    /// Requires a non-empty `security_key`.
    pub async fn create_session(&self, security_key: &str, device_name: &str) -> Result<SessionInfo, DomainError> {
        if security_key.is_empty() {
            return Err(DomainError::unauthenticated("security_key must not be empty"));
        }
        let info = SessionInfo {
            session_id: Uuid::new_v4().to_string(),
            device_name: device_name.to_string(),
            host_name: self.host_name.clone(),
            connected_at_unix_ms: now_unix_ms(),
        };
        self.sessions.write().await.insert(info.session_id.clone(), info.clone());
        Ok(info)
    }

    pub async fn heartbeat(&self, session_id: &str) -> Result<(), DomainError> {
        if self.sessions.read().await.contains_key(session_id) {
            Ok(())
        } else {
            Err(DomainError::not_found("unknown session"))
        }
    }

    async fn require_session(&self, session_id: &str) -> Result<(), DomainError> {
        self.heartbeat(session_id).await
    }

    /// Runs an allowlisted command locally with a bounded timeout and
    /// output cap.
    pub async fn execute_command(
        &self,
        session_id: &str,
        command: &str,
        args: &[String],
    ) -> Result<CommandResult, DomainError> {
        self.require_session(session_id).await?;
        let resolved = validate_command(command, args)?;
        Ok(run_child(&resolved.program, &resolved.args, COMMAND_TIMEOUT).await)
    }

    /// Selects a device via the registry's routing policy and either runs
    /// locally or forwards to the remote device's `ExecuteCommand` RPC.
    pub async fn execute_routed_command(
        &self,
        session_id: &str,
        policy: &RoutingPolicy,
        command: &str,
        args: &[String],
    ) -> Result<RoutedCommandResult, DomainError> {
        self.require_session(session_id).await?;

        let started = std::time::Instant::now();
        let selection = self.registry.select(policy, &self.self_id).await;
        let device = match selection.device {
            Some(d) => d,
            None => {
                return Err(DomainError::policy_rejected(
                    selection.error.unwrap_or_else(|| "no device selected".to_string()),
                ))
            }
        };

        let output = if selection.executed_locally {
            self.execute_command(session_id, command, args).await?
        } else {
            self.rpc_client.execute_command_remote(&device.rpc_addr, session_id, command, args).await?
        };

        Ok(RoutedCommandResult {
            selected_device_id: Some(device.device_id),
            executed_locally: selection.executed_locally,
            total_time_ms: started.elapsed().as_millis() as u64,
            output,
        })
    }

    /// Advisory routing decision without executing anything.
    pub async fn run_ai_task(&self, session_id: &str, _task: &str, input: &str) -> Result<AiTaskAdvice, DomainError> {
        self.require_session(session_id).await?;
        let devices = self.registry.list().await;
        let best = select_best_llm_device(&devices);
        Ok(AiTaskAdvice {
            selected_device_id: best.as_ref().map(|d| d.device_id.clone()),
            selected_device_addr: best.as_ref().map(|d| d.rpc_addr.clone()),
            would_use_npu: best.as_ref().map(|d| d.has_npu).unwrap_or(false),
            result: format!("advisory routing only, input={input}"),
        })
    }
}

async fn run_child(program: &str, args: &[String], timeout: Duration) -> CommandResult {
    let mut command = Command::new(program);
    command.args(args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(c) => c,
        Err(e) => {
            return CommandResult { exit_code: -1, stdout: String::new(), stderr: format!("failed to spawn: {e}") };
        }
    };

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let wait = async {
        let stdout_fut = async {
            let mut stdout = String::new();
            if let Some(mut pipe) = stdout_pipe.take() {
                read_capped(&mut pipe, &mut stdout).await;
            }
            stdout
        };
        let stderr_fut = async {
            let mut stderr = String::new();
            if let Some(mut pipe) = stderr_pipe.take() {
                read_capped(&mut pipe, &mut stderr).await;
            }
            stderr
        };
        // Drain both pipes concurrently with the wait: a child that fills the
        // OS pipe buffer before exiting would otherwise deadlock `wait()`.
        let (status, stdout, stderr) = tokio::join!(child.wait(), stdout_fut, stderr_fut);
        (status, stdout, stderr)
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok((Ok(status), stdout, stderr)) => {
            CommandResult { exit_code: status.code().unwrap_or(-1), stdout, stderr }
        }
        Ok((Err(e), stdout, stderr)) => {
            CommandResult { exit_code: -1, stdout, stderr: format!("{stderr}\nwait failed: {e}") }
        }
        Err(_elapsed) => {
            let _ = child.kill().await;
            CommandResult {
                exit_code: -1,
                stdout: String::new(),
                stderr: format!("command timed out after {}s", timeout.as_secs()),
            }
        }
    }
}

async fn read_capped<R: tokio::io::AsyncRead + Unpin>(reader: &mut R, out: &mut String) {
    let mut buf = vec![0u8; OUTPUT_CAP_BYTES];
    let mut total = 0usize;
    let mut bytes = Vec::new();
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        if total < OUTPUT_CAP_BYTES {
            let take = (OUTPUT_CAP_BYTES - total).min(n);
            bytes.extend_from_slice(&buf[..take]);
            total += take;
        }
        // Further bytes beyond the cap are discarded.
    }
    *out = String::from_utf8_lossy(&bytes).into_owned();
}

/// Public wrapper for callers outside this module that need the same
/// host-name resolution used to stamp `SessionInfo`.
pub fn hostname_for_display() -> String {
    hostname()
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".to_string())
}

#[path = "session_tests.rs"]
#[cfg(test)]
mod session_tests;
