use super::*;

fn sample(ts: i64) -> MetricsSample {
    MetricsSample {
        timestamp_ms: ts,
        cpu_load: 0.5,
        mem_used_mb: 100,
        mem_total_mb: 1000,
        gpu_load: None,
        gpu_mem_used_mb: None,
        gpu_mem_total_mb: None,
        npu_load: None,
    }
}

#[tokio::test]
async fn ring_buffer_drops_oldest_on_overflow() {
    let store = MetricsStore::new();
    for i in 0..(MAX_SAMPLES + 10) {
        store.add_sample("dev", "Dev", sample(i as i64)).await;
    }
    let history = store.get_history("dev", 0).await;
    assert_eq!(history.len(), MAX_SAMPLES);
    assert_eq!(history.first().unwrap().timestamp_ms, 10);
    assert_eq!(history.last().unwrap().timestamp_ms, (MAX_SAMPLES + 9) as i64);
}

#[tokio::test]
async fn get_history_filters_by_since() {
    let store = MetricsStore::new();
    for i in 0..5 {
        store.add_sample("dev", "Dev", sample(i)).await;
    }
    let history = store.get_history("dev", 2).await;
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|s| s.timestamp_ms > 2));
}

#[tokio::test]
async fn unknown_device_returns_empty_history() {
    let store = MetricsStore::new();
    assert!(store.get_history("missing", 0).await.is_empty());
}

#[tokio::test]
async fn cleanup_drops_devices_past_retention() {
    let store = MetricsStore::new();
    store.add_sample("stale", "Stale", sample(0)).await;
    let dropped = store.cleanup().await;
    assert_eq!(dropped, vec!["stale".to_string()]);
    assert!(store.get_history("stale", 0).await.is_empty());
}
