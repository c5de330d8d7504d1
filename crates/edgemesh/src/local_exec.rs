//! Local task execution: what a worker device actually does for a task
//! landing on it via `SubmitTask`, whether that RPC arrived from a remote
//! coordinator or the task was materialized onto this same node.

use std::sync::Arc;

use crate::job::manager::TaskOutcome;
use crate::job::{Task, TaskKind};
use crate::llm::LlmClient;

/// Runs a single task on this device and returns its outcome. Never panics;
/// unknown or out-of-scope kinds come back as a failed outcome with a
/// descriptive error rather than a crash.
pub async fn execute_task_locally(task: &Task, llm_client: Option<&Arc<LlmClient>>) -> TaskOutcome {
    match &task.kind {
        TaskKind::Sysinfo => TaskOutcome { ok: true, result: Some(sysinfo_snapshot()), error: None },
        TaskKind::Echo => TaskOutcome { ok: true, result: Some(task.input.clone()), error: None },
        TaskKind::LlmGenerate => run_llm_generate(task, llm_client).await,
        TaskKind::ImageGenerate => TaskOutcome {
            ok: false,
            result: None,
            error: Some("image generation execution is an external collaborator surface; no local model is wired in".to_string()),
        },
        TaskKind::Unknown(kind) => {
            TaskOutcome { ok: false, result: None, error: Some(format!("unknown task kind: {kind}")) }
        }
    }
}

async fn run_llm_generate(task: &Task, llm_client: Option<&Arc<LlmClient>>) -> TaskOutcome {
    let Some(client) = llm_client else {
        return TaskOutcome {
            ok: false,
            result: None,
            error: Some("no LLM endpoint configured on this device".to_string()),
        };
    };
    match client.complete("You are a helpful assistant.", &task.input).await {
        Ok(text) => TaskOutcome { ok: true, result: Some(text), error: None },
        Err(e) => TaskOutcome { ok: false, result: None, error: Some(e.message) },
    }
}

fn sysinfo_snapshot() -> String {
    format!(
        "platform={} arch={} cpus={}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    )
}

#[path = "local_exec_tests.rs"]
#[cfg(test)]
mod local_exec_tests;
