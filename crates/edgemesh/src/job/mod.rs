//! Job & task data model and state machine.

pub mod manager;
pub mod plan_gen;
pub mod reduce;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Queued,
    Running,
    Done,
    Failed,
}

/// Extensible task kind. Unknown kinds round-trip through `Unknown`
/// rather than failing to parse, so plan validation can reject
/// them with a clear message instead of a deserialization error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Sysinfo,
    Echo,
    LlmGenerate,
    ImageGenerate,
    Unknown(String),
}

impl TaskKind {
    pub fn is_known(&self) -> bool {
        !matches!(self, TaskKind::Unknown(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::Sysinfo => "SYSINFO",
            TaskKind::Echo => "ECHO",
            TaskKind::LlmGenerate => "LLM_GENERATE",
            TaskKind::ImageGenerate => "IMAGE_GENERATE",
            TaskKind::Unknown(s) => s,
        }
    }

    fn from_str_value(s: &str) -> Self {
        match s {
            "SYSINFO" => TaskKind::Sysinfo,
            "ECHO" => TaskKind::Echo,
            "LLM_GENERATE" => TaskKind::LlmGenerate,
            "IMAGE_GENERATE" => TaskKind::ImageGenerate,
            other => TaskKind::Unknown(other.to_string()),
        }
    }
}

impl Serialize for TaskKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(TaskKind::from_str_value(&raw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub input: String,
    #[serde(default)]
    pub target_device_id: Option<String>,
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGroup {
    pub index: u32,
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceSpec {
    pub kind: String,
}

impl Default for ReduceSpec {
    fn default() -> Self {
        Self { kind: "CONCAT".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Plan {
    pub groups: Vec<TaskGroup>,
}

impl Plan {
    /// Group indices are contiguous starting at 0.
    pub fn has_contiguous_groups(&self) -> bool {
        self.groups.iter().enumerate().all(|(i, g)| g.index as usize == i)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub job_id: String,
    pub kind: TaskKind,
    pub input: String,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub device_addr: Option<String>,
    pub state: TaskState,
    pub result: Option<String>,
    pub error: Option<String>,
    pub group_index: u32,
    pub prompt_tokens: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub created_at_unix_ms: i64,
    pub state: JobState,
    pub groups: Vec<TaskGroup>,
    pub tasks: Vec<Task>,
    pub current_group_index: u32,
    pub total_groups: u32,
    pub reduce_spec: ReduceSpec,
    pub final_result: Option<String>,
    pub error: Option<String>,
    /// Notes recorded during plan generation/validation, e.g. an
    /// LLM-plan fallback to the rule-based planner.
    pub notes: Vec<String>,
}

impl Job {
    pub fn tasks_in_group(&self, index: u32) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.group_index == index)
    }
}
