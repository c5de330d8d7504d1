//! Plan→tasks materialization, group execution, and reduce.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::device::DeviceInfo;
use crate::error::DomainError;
use crate::llm::LlmClient;
use crate::registry::now_unix_ms;

use super::plan_gen::{llm_assisted_plan, rule_based_plan, validate_plan};
use super::reduce::reduce;
use super::{Job, JobState, Plan, ReduceSpec, Task, TaskGroup, TaskState};

/// Result of dispatching a single task to a device, whatever executes it
/// (local execution or a remote worker's `SubmitTask` RPC).
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub ok: bool,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// Collaborator that actually runs a task on a device. Implemented by
/// [`crate::rpc_client::RpcTaskRunner`] in production and by a fake in
/// tests.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run_task(&self, device_addr: &str, task: &Task) -> TaskOutcome;
}

pub struct JobManager {
    jobs: RwLock<HashMap<String, Job>>,
    runner: Arc<dyn TaskRunner>,
    llm_client: Option<Arc<LlmClient>>,
    use_llm_planner: bool,
}

impl JobManager {
    pub fn new(runner: Arc<dyn TaskRunner>, llm_client: Option<Arc<LlmClient>>, use_llm_planner: bool) -> Self {
        Self { jobs: RwLock::new(HashMap::new()), runner, llm_client, use_llm_planner }
    }

    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    pub async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Builds a plan (supplied, LLM-assisted, or rule-based), materializes
    /// tasks, and spawns execution. Returns the job immediately in
    /// `QUEUED` state; execution updates it asynchronously.
    pub async fn create_job(
        self: &Arc<Self>,
        user_text: &str,
        devices: Vec<DeviceInfo>,
        max_workers: usize,
        supplied_plan: Option<Plan>,
        reduce_spec: Option<ReduceSpec>,
    ) -> Job {
        let clamped_devices: Vec<DeviceInfo> = if max_workers > 0 {
            devices.into_iter().take(max_workers).collect()
        } else {
            devices
        };

        let mut notes = Vec::new();
        let plan = match supplied_plan {
            Some(p) => p,
            None => match (&self.llm_client, self.use_llm_planner) {
                (Some(client), true) => {
                    let result = llm_assisted_plan(client, user_text, &clamped_devices).await;
                    notes.extend(result.notes);
                    result.plan
                }
                _ => rule_based_plan(user_text, &clamped_devices),
            },
        };

        let job_id = Uuid::new_v4().to_string();
        let tasks = materialize_tasks(&job_id, &plan, &clamped_devices);

        let job = Job {
            job_id: job_id.clone(),
            created_at_unix_ms: now_unix_ms(),
            state: JobState::Queued,
            groups: plan.groups,
            tasks,
            current_group_index: 0,
            total_groups: 0,
            reduce_spec: reduce_spec.unwrap_or_default(),
            final_result: None,
            error: None,
            notes,
        };
        let total_groups = job.groups.len() as u32;
        let job = Job { total_groups, ..job };

        self.jobs.write().await.insert(job_id.clone(), job.clone());

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.execute(job_id).await;
        });

        job
    }

    async fn execute(self: Arc<Self>, job_id: String) {
        {
            let mut jobs = self.jobs.write().await;
            if let Some(job) = jobs.get_mut(&job_id) {
                job.state = JobState::Running;
            }
        }

        let group_count = {
            let jobs = self.jobs.read().await;
            jobs.get(&job_id).map(|j| j.groups.len()).unwrap_or(0)
        };

        for group_index in 0..group_count {
            {
                let mut jobs = self.jobs.write().await;
                if let Some(job) = jobs.get_mut(&job_id) {
                    job.current_group_index = group_index as u32;
                }
            }

            let task_ids: Vec<String> = {
                let jobs = self.jobs.read().await;
                jobs.get(&job_id)
                    .map(|j| j.tasks_in_group(group_index as u32).map(|t| t.task_id.clone()).collect())
                    .unwrap_or_default()
            };

            let mut handles = Vec::new();
            for task_id in task_ids {
                let manager = Arc::clone(&self);
                let job_id = job_id.clone();
                handles.push(tokio::spawn(async move {
                    manager.dispatch_task(&job_id, &task_id).await;
                }));
            }
            for handle in handles {
                let _ = handle.await;
            }

            let failed = {
                let jobs = self.jobs.read().await;
                jobs.get(&job_id)
                    .map(|j| j.tasks_in_group(group_index as u32).find(|t| t.state == TaskState::Failed).cloned())
                    .unwrap_or(None)
            };

            if let Some(failed_task) = failed {
                let mut jobs = self.jobs.write().await;
                if let Some(job) = jobs.get_mut(&job_id) {
                    job.state = JobState::Failed;
                    job.error = failed_task.error.clone();
                }
                return;
            }
        }

        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            let result = reduce(job);
            job.final_result = Some(result);
            job.state = JobState::Done;
        }
    }

    async fn dispatch_task(&self, job_id: &str, task_id: &str) {
        let (addr, task) = {
            let mut jobs = self.jobs.write().await;
            let job = match jobs.get_mut(job_id) {
                Some(j) => j,
                None => return,
            };
            let task = match job.tasks.iter_mut().find(|t| t.task_id == task_id) {
                Some(t) => t,
                None => return,
            };
            task.state = TaskState::Running;
            (task.device_addr.clone().unwrap_or_default(), task.clone())
        };

        let outcome = self.runner.run_task(&addr, &task).await;

        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            if let Some(t) = job.tasks.iter_mut().find(|t| t.task_id == task_id) {
                if outcome.ok {
                    t.state = TaskState::Done;
                    t.result = outcome.result;
                } else {
                    t.state = TaskState::Failed;
                    t.error = outcome.error.or_else(|| Some("task execution failed".to_string()));
                }
            }
        }
    }
}

fn materialize_tasks(job_id: &str, plan: &Plan, devices: &[DeviceInfo]) -> Vec<Task> {
    let mut tasks = Vec::new();
    for group in &plan.groups {
        for spec in &group.tasks {
            let chosen = spec
                .target_device_id
                .clone()
                .and_then(|id| devices.iter().find(|d| d.device_id == id).cloned())
                .or_else(|| devices.first().cloned());

            tasks.push(Task {
                task_id: Uuid::new_v4().to_string(),
                job_id: job_id.to_string(),
                kind: spec.kind.clone(),
                input: spec.input.clone(),
                device_id: chosen.as_ref().map(|d| d.device_id.clone()),
                device_name: chosen.as_ref().map(|d| d.name.clone()),
                device_addr: chosen.as_ref().map(|d| d.rpc_addr.clone()),
                state: TaskState::Queued,
                result: None,
                error: None,
                group_index: group.index,
                prompt_tokens: spec.prompt_tokens,
                max_output_tokens: spec.max_output_tokens,
            });
        }
    }
    tasks
}

/// Validates a plan is well-formed before use by `create_job` when a
/// caller supplies one directly via the HTTP/RPC surface.
pub fn validate_supplied_plan(plan: &Plan) -> Result<(), DomainError> {
    validate_plan(plan).map_err(DomainError::invalid_argument)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod manager_tests;
