use super::*;
use crate::job::{TaskGroup, TaskKind, TaskSpec};

fn device(id: &str, prefill: f64, decode: f64) -> DeviceInfo {
    DeviceInfo {
        device_id: id.to_string(),
        name: id.to_string(),
        platform: "linux".to_string(),
        arch: "x86_64".to_string(),
        has_cpu: true,
        has_gpu: false,
        has_npu: false,
        can_screen_capture: false,
        has_local_model: false,
        local_model_name: None,
        rpc_addr: format!("{id}:1"),
        prefill_tokens_per_s: prefill,
        decode_tokens_per_s: decode,
        ram_free_mb: None,
    }
}

fn llm_task(prompt_tokens: u32, max_output_tokens: u32) -> TaskSpec {
    TaskSpec {
        kind: TaskKind::LlmGenerate,
        input: "summarize".to_string(),
        target_device_id: None,
        prompt_tokens: Some(prompt_tokens),
        max_output_tokens: Some(max_output_tokens),
    }
}

#[test]
fn empty_plan_is_zero_latency() {
    let plan = Plan { groups: vec![] };
    let estimate = estimate_cost(Some(&plan), &[device("a", 300.0, 30.0)]);
    assert_eq!(estimate.estimated_latency_ms, 0.0);
    assert!(estimate.warning.is_none());
}

#[test]
fn nil_plan_warns_with_no_device_picked() {
    let estimate = estimate_cost(None, &[device("a", 300.0, 30.0)]);
    assert!(estimate.recommended_device_id.is_none());
    assert!(estimate.warning.is_some());
}

#[test]
fn empty_devices_warns_with_no_device_picked() {
    let plan = Plan { groups: vec![TaskGroup { index: 0, tasks: vec![llm_task(100, 50)] }] };
    let estimate = estimate_cost(Some(&plan), &[]);
    assert!(estimate.recommended_device_id.is_none());
    assert!(estimate.warning.is_some());
}

#[test]
fn unknown_kind_sets_has_unknown_costs_and_warns() {
    let plan = Plan {
        groups: vec![TaskGroup {
            index: 0,
            tasks: vec![TaskSpec {
                kind: TaskKind::Unknown("CUSTOM".to_string()),
                input: "x".to_string(),
                target_device_id: None,
                prompt_tokens: None,
                max_output_tokens: None,
            }],
        }],
    };
    let estimate = estimate_cost(Some(&plan), &[device("a", 300.0, 30.0)]);
    assert!(estimate.has_unknown_costs);
    assert!(estimate.warning.is_some());
}

#[test]
fn cost_comparison_scenario_matches_spec_example() {
    // Scenario 3: two parallel LLM_GENERATE tasks per device.
    let plan = Plan {
        groups: vec![TaskGroup { index: 0, tasks: vec![llm_task(500, 200), llm_task(100, 50)] }],
    };
    let device_a = device("a", 300.0, 30.0);
    let device_b = device("b", 600.0, 60.0);

    let estimate = estimate_cost(Some(&plan), &[device_a, device_b]);

    let cost_a = estimate.device_costs.iter().find(|dc| dc.device_id == "a").unwrap();
    let cost_b = estimate.device_costs.iter().find(|dc| dc.device_id == "b").unwrap();

    assert!((cost_a.total_latency_ms - 8333.33).abs() < 1.0);
    assert!((cost_b.total_latency_ms - 4166.67).abs() < 1.0);
    assert_eq!(estimate.recommended_device_id.as_deref(), Some("b"));
}

#[test]
fn latency_is_monotonic_in_token_counts() {
    let device = device("a", 300.0, 30.0);
    let small = llm_task(100, 50);
    let large = llm_task(500, 200);

    let plan_small = Plan { groups: vec![TaskGroup { index: 0, tasks: vec![small] }] };
    let plan_large = Plan { groups: vec![TaskGroup { index: 0, tasks: vec![large] }] };

    let estimate_small = estimate_cost(Some(&plan_small), std::slice::from_ref(&device));
    let estimate_large = estimate_cost(Some(&plan_large), std::slice::from_ref(&device));

    assert!(estimate_small.estimated_latency_ms <= estimate_large.estimated_latency_ms);
}

#[test]
fn peak_memory_propagates_across_groups_and_flags_insufficient_ram() {
    let mut device = device("a", 300.0, 30.0);
    device.ram_free_mb = Some(1000); // less than the 2048MB LLM default

    let plan = Plan { groups: vec![TaskGroup { index: 0, tasks: vec![llm_task(10, 10)] }] };
    let estimate = estimate_cost(Some(&plan), &[device]);
    assert!(!estimate.device_costs[0].ram_sufficient);
}
