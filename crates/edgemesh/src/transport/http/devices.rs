//! Device catalog, metrics history, and mesh-wide activity handlers
//!.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::device::DeviceInfo;
use crate::error::DomainError;
use crate::job::{Task, TaskState};
use crate::metrics::MetricsSample;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceInfo>,
}

pub async fn devices(State(state): State<Arc<AppState>>) -> Json<DevicesResponse> {
    Json(DevicesResponse { devices: state.registry.list().await })
}

#[derive(Debug, Deserialize)]
pub struct DeviceMetricsQuery {
    pub device_id: String,
    #[serde(default)]
    pub since_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct DeviceMetricsResponse {
    pub samples: Vec<MetricsSample>,
}

pub async fn device_metrics(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeviceMetricsQuery>,
) -> Result<Json<DeviceMetricsResponse>, DomainError> {
    if q.device_id.is_empty() {
        return Err(DomainError::invalid_argument("device_id must not be empty"));
    }
    let samples = state.metrics.get_history(&q.device_id, q.since_ms).await;
    Ok(Json(DeviceMetricsResponse { samples }))
}

#[derive(Debug, Deserialize, Default)]
pub struct ActivityQuery {
    #[serde(default)]
    pub include_metrics_history: bool,
}

#[derive(Debug, Serialize)]
pub struct DeviceActivity {
    pub device_id: String,
    pub name: String,
    pub running_task_count: usize,
    pub status: crate::device::DeviceStatus,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub running_tasks: Vec<Task>,
    pub device_activities: Vec<DeviceActivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_history: Option<Vec<(String, Vec<MetricsSample>)>>,
}

pub async fn activity(State(state): State<Arc<AppState>>, Query(q): Query<ActivityQuery>) -> Json<ActivityResponse> {
    let jobs = state.jobs.list().await;
    let running_tasks: Vec<Task> = jobs
        .iter()
        .flat_map(|j| j.tasks.iter().filter(|t| t.state == TaskState::Running).cloned())
        .collect();

    let devices = state.registry.list().await;
    let mut device_activities = Vec::with_capacity(devices.len());
    for device in &devices {
        let running_task_count = running_tasks.iter().filter(|t| t.device_id.as_deref() == Some(device.device_id.as_str())).count();
        let status = state.registry.get_status(&device.device_id).await;
        device_activities.push(DeviceActivity {
            device_id: device.device_id.clone(),
            name: device.name.clone(),
            running_task_count,
            status,
        });
    }

    let metrics_history = if q.include_metrics_history {
        let mut history = Vec::with_capacity(devices.len());
        for device in &devices {
            history.push((device.device_id.clone(), state.metrics.get_history(&device.device_id, 0).await));
        }
        Some(history)
    } else {
        None
    };

    Json(ActivityResponse { running_tasks, device_activities, metrics_history })
}
