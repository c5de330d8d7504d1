//! Plan generation: rule-based fallback and LLM-assisted planning.

use serde::{Deserialize, Serialize};

use crate::device::DeviceInfo;
use crate::llm::{LlmClient, PLAN_SYSTEM_PROMPT};
use crate::registry::{best_available_for_plan, select_best_llm_device};

use super::{Plan, TaskGroup, TaskKind, TaskSpec};

const IMAGE_KEYWORDS: &[&str] = &["image", "picture", "draw", "render", "visualize"];
const LLM_KEYWORDS: &[&str] = &["summarize", "write", "code", "explain", "chat", "translate"];

fn matches_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResult {
    pub plan: Plan,
    pub used_ai: bool,
    pub rationale: String,
    pub notes: Vec<String>,
}

/// Classifies `user_text` by keyword heuristics and builds a single-group
/// plan without needing the LLM planner.
pub fn rule_based_plan(user_text: &str, devices: &[DeviceInfo]) -> Plan {
    let lowered = user_text.to_lowercase();

    if matches_any(&lowered, IMAGE_KEYWORDS) {
        if let Some(device) = best_available_for_plan(devices) {
            return Plan {
                groups: vec![TaskGroup {
                    index: 0,
                    tasks: vec![TaskSpec {
                        kind: TaskKind::ImageGenerate,
                        input: user_text.to_string(),
                        target_device_id: Some(device.device_id),
                        prompt_tokens: None,
                        max_output_tokens: None,
                    }],
                }],
            };
        }
    }

    if matches_any(&lowered, LLM_KEYWORDS) {
        if let Some(device) = select_best_llm_device(devices) {
            return Plan {
                groups: vec![TaskGroup {
                    index: 0,
                    tasks: vec![TaskSpec {
                        kind: TaskKind::LlmGenerate,
                        input: user_text.to_string(),
                        target_device_id: Some(device.device_id),
                        prompt_tokens: Some(estimate_prompt_tokens(user_text)),
                        max_output_tokens: Some(256),
                    }],
                }],
            };
        }
    }

    // Default: one SYSINFO per selected device in group 0.
    Plan {
        groups: vec![TaskGroup {
            index: 0,
            tasks: devices
                .iter()
                .map(|d| TaskSpec {
                    kind: TaskKind::Sysinfo,
                    input: user_text.to_string(),
                    target_device_id: Some(d.device_id.clone()),
                    prompt_tokens: None,
                    max_output_tokens: None,
                })
                .collect(),
        }],
    }
}

fn estimate_prompt_tokens(text: &str) -> u32 {
    // Rough token estimate: ~4 chars/token, matching common tokenizer ratios.
    ((text.len() as f32) / 4.0).ceil() as u32
}

/// Validates a candidate plan parsed from LLM output: must be
/// valid JSON (already guaranteed by caller), have contiguous groups
/// starting at 0, and contain only known task kinds.
pub fn validate_plan(plan: &Plan) -> Result<(), String> {
    if plan.groups.is_empty() {
        return Err("plan has no groups".to_string());
    }
    if !plan.has_contiguous_groups() {
        return Err("plan group indices are not contiguous starting at 0".to_string());
    }
    for group in &plan.groups {
        for task in &group.tasks {
            if !task.kind.is_known() {
                return Err(format!("plan contains unknown task kind '{}'", task.kind.as_str()));
            }
        }
    }
    Ok(())
}

/// Sends `user_text` + the device catalog to the LLM, parses and validates
/// the result, and falls back to the rule-based plan on any failure.
pub async fn llm_assisted_plan(client: &LlmClient, user_text: &str, devices: &[DeviceInfo]) -> PlanResult {
    let catalog = match serde_json::to_string(devices) {
        Ok(c) => c,
        Err(_) => {
            return fallback(user_text, devices, "failed to serialize device catalog");
        }
    };
    let prompt = format!("{user_text}\n\nAvailable devices:\n{catalog}");

    let raw = match client.complete(PLAN_SYSTEM_PROMPT, &prompt).await {
        Ok(r) => r,
        Err(e) => return fallback(user_text, devices, &format!("LLM call failed: {e}")),
    };

    let plan: Plan = match serde_json::from_str(raw.trim()) {
        Ok(p) => p,
        Err(e) => return fallback(user_text, devices, &format!("LLM output was not valid Plan JSON: {e}")),
    };

    if let Err(reason) = validate_plan(&plan) {
        return fallback(user_text, devices, &reason);
    }

    PlanResult { plan, used_ai: true, rationale: "LLM-assisted plan".to_string(), notes: vec![] }
}

fn fallback(user_text: &str, devices: &[DeviceInfo], reason: &str) -> PlanResult {
    PlanResult {
        plan: rule_based_plan(user_text, devices),
        used_ai: false,
        rationale: "rule-based fallback".to_string(),
        notes: vec![format!("LLM plan validation failed, fell back to rule-based plan: {reason}")],
    }
}

#[cfg(test)]
#[path = "plan_gen_tests.rs"]
mod plan_gen_tests;
