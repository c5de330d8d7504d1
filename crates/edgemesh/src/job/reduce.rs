//! Post-group result aggregation.

use super::{Job, TaskState};

/// Joins `task.result` of all `DONE` tasks, in task order, with a single
/// newline separator. Currently the only supported `reduce_spec.kind`.
pub fn concat(job: &Job) -> String {
    job.tasks
        .iter()
        .filter(|t| t.state == TaskState::Done)
        .filter_map(|t| t.result.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn reduce(job: &Job) -> String {
    match job.reduce_spec.kind.as_str() {
        "CONCAT" => concat(job),
        other => {
            tracing::warn!(kind = other, "unknown reduce kind, falling back to CONCAT");
            concat(job)
        }
    }
}
