//! Job submission, plan preview, and cost-estimate handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::job::manager::validate_supplied_plan;
use crate::job::plan_gen::{llm_assisted_plan, rule_based_plan};
use crate::job::{Job, Plan, ReduceSpec, Task};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub text: String,
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub reduce_spec: Option<ReduceSpec>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub summary: String,
}

pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitJobRequest>,
) -> Result<Json<SubmitJobResponse>, DomainError> {
    if req.text.is_empty() && req.plan.is_none() {
        return Err(DomainError::invalid_argument("text or plan must be provided"));
    }
    if let Some(plan) = &req.plan {
        validate_supplied_plan(plan)?;
    }

    let devices = state.registry.list().await;
    let job = state
        .jobs
        .create_job(&req.text, devices, req.max_workers.unwrap_or(0), req.plan, req.reduce_spec)
        .await;

    Ok(Json(SubmitJobResponse {
        summary: format!("job {} queued with {} group(s)", job.job_id, job.total_groups),
        job_id: job.job_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct JobQuery {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub state: crate::job::JobState,
    pub final_result: Option<String>,
    pub error: Option<String>,
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

/// `GET /api/job?id=` — summary only, no per-task detail.
pub async fn job(State(state): State<Arc<AppState>>, Query(q): Query<JobQuery>) -> Result<Json<JobResponse>, DomainError> {
    let job: Job = state.jobs.get(&q.id).await.ok_or_else(|| DomainError::not_found("unknown job"))?;
    Ok(Json(JobResponse {
        id: job.job_id,
        state: job.state,
        final_result: job.final_result,
        error: job.error,
        notes: job.notes,
        tasks: None,
    }))
}

/// `GET /api/job-detail?id=` — same shape, with the full per-task list.
pub async fn job_detail(
    State(state): State<Arc<AppState>>,
    Query(q): Query<JobQuery>,
) -> Result<Json<JobResponse>, DomainError> {
    let job: Job = state.jobs.get(&q.id).await.ok_or_else(|| DomainError::not_found("unknown job"))?;
    Ok(Json(JobResponse {
        id: job.job_id,
        state: job.state,
        final_result: job.final_result,
        error: job.error,
        notes: job.notes,
        tasks: Some(job.tasks),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub text: String,
    #[serde(default)]
    pub max_workers: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan: Plan,
    pub used_ai: bool,
    pub rationale: String,
    pub notes: Vec<String>,
}

pub async fn plan(State(state): State<Arc<AppState>>, Json(req): Json<PlanRequest>) -> Result<Json<PlanResponse>, DomainError> {
    if req.text.is_empty() {
        return Err(DomainError::invalid_argument("text must not be empty"));
    }

    let all_devices = state.registry.list().await;
    let devices: Vec<_> = match req.max_workers {
        Some(n) if n > 0 => all_devices.into_iter().take(n).collect(),
        _ => all_devices,
    };

    let result = match (&state.llm_client, state.config.use_llm_planner) {
        (Some(client), true) => llm_assisted_plan(client, &req.text, &devices).await,
        _ => crate::job::plan_gen::PlanResult {
            plan: rule_based_plan(&req.text, &devices),
            used_ai: false,
            rationale: "rule-based plan".to_string(),
            notes: vec![],
        },
    };

    Ok(Json(PlanResponse { plan: result.plan, used_ai: result.used_ai, rationale: result.rationale, notes: result.notes }))
}

#[derive(Debug, Deserialize)]
pub struct PlanCostRequest {
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub max_workers: Option<usize>,
}

pub async fn plan_cost(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlanCostRequest>,
) -> Result<Json<crate::cost::CostEstimate>, DomainError> {
    let all_devices = state.registry.list().await;
    let devices: Vec<_> = match req.max_workers {
        Some(n) if n > 0 => all_devices.into_iter().take(n).collect(),
        _ => all_devices,
    };

    let plan = match req.plan {
        Some(p) => Some(p),
        None => match &req.text {
            Some(text) if !text.is_empty() => Some(rule_based_plan(text, &devices)),
            _ => None,
        },
    };

    Ok(Json(crate::cost::estimate_cost(plan.as_ref(), &devices)))
}
