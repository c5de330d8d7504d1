use super::*;
use crate::stream::capture::RawFrame;

struct FakeCapture;

#[async_trait::async_trait]
impl ScreenCapture for FakeCapture {
    async fn capture(&self, _monitor_index: i32) -> Option<RawFrame> {
        Some(RawFrame { width: 64, height: 64, rgb: vec![0u8; 64 * 64 * 3] })
    }

    async fn monitor_count(&self) -> usize {
        1
    }
}

#[tokio::test]
async fn start_produces_a_stream_id_and_sdp_offer() {
    let manager = StreamManager::new(Arc::new(FakeCapture));
    let (stream_id, offer_sdp) = tokio::time::timeout(Duration::from_secs(10), manager.start(10, 70, 0))
        .await
        .expect("start should not hang")
        .expect("start should succeed");

    assert!(!stream_id.is_empty());
    assert!(offer_sdp.contains("v=0"));

    manager.stop(&stream_id).await.unwrap();
}

#[tokio::test]
async fn answer_on_unknown_stream_is_not_found() {
    let manager = StreamManager::new(Arc::new(FakeCapture));
    let err = manager.answer("nope", "v=0").await.unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::NotFound);
}

#[tokio::test]
async fn stop_on_unknown_stream_is_not_found() {
    let manager = StreamManager::new(Arc::new(FakeCapture));
    let err = manager.stop("nope").await.unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::NotFound);
}

#[tokio::test]
async fn start_rejects_monitor_index_out_of_range() {
    let manager = StreamManager::new(Arc::new(FakeCapture));
    let err = manager.start(10, 70, 1).await.unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::InvalidArgument);
}

#[tokio::test]
async fn start_rejects_negative_monitor_index() {
    let manager = StreamManager::new(Arc::new(FakeCapture));
    let err = manager.start(10, 70, -1).await.unwrap_err();
    assert_eq!(err.code, crate::error::ErrorCode::InvalidArgument);
}
