use super::*;
use crate::job::TaskState;

fn task(kind: TaskKind, input: &str) -> Task {
    Task {
        task_id: "t1".to_string(),
        job_id: "j1".to_string(),
        kind,
        input: input.to_string(),
        device_id: None,
        device_name: None,
        device_addr: None,
        state: TaskState::Running,
        result: None,
        error: None,
        group_index: 0,
        prompt_tokens: None,
        max_output_tokens: None,
    }
}

#[tokio::test]
async fn echo_returns_input_verbatim() {
    let outcome = execute_task_locally(&task(TaskKind::Echo, "hello"), None).await;
    assert!(outcome.ok);
    assert_eq!(outcome.result.as_deref(), Some("hello"));
}

#[tokio::test]
async fn sysinfo_reports_platform_and_arch() {
    let outcome = execute_task_locally(&task(TaskKind::Sysinfo, ""), None).await;
    assert!(outcome.ok);
    let result = outcome.result.unwrap();
    assert!(result.contains("platform="));
    assert!(result.contains("arch="));
}

#[tokio::test]
async fn llm_generate_without_client_fails_cleanly() {
    let outcome = execute_task_locally(&task(TaskKind::LlmGenerate, "hi"), None).await;
    assert!(!outcome.ok);
    assert!(outcome.error.unwrap().contains("no LLM endpoint"));
}

#[tokio::test]
async fn image_generate_is_out_of_scope() {
    let outcome = execute_task_locally(&task(TaskKind::ImageGenerate, "a cat"), None).await;
    assert!(!outcome.ok);
    assert!(outcome.error.unwrap().contains("external collaborator"));
}

#[tokio::test]
async fn unknown_kind_fails_with_descriptive_error() {
    let outcome = execute_task_locally(&task(TaskKind::Unknown("FROBNICATE".to_string()), ""), None).await;
    assert!(!outcome.ok);
    assert!(outcome.error.unwrap().contains("FROBNICATE"));
}
