//! WebRTC screen-streaming plane: negotiates a peer connection per
//! stream, then pumps captured frames over a data channel at a target
//! frame rate until stopped.

pub mod capture;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;
use webrtc::api::APIBuilder;
use webrtc::data_channel::RTCDataChannel;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use crate::error::DomainError;

use self::capture::{encode_frame, ScreenCapture};

const ICE_GATHER_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_JPEG_QUALITY: u8 = 60;

struct StreamEntry {
    peer_connection: Arc<RTCPeerConnection>,
    cancel: CancellationToken,
}

/// One active (or awaiting-answer) WebRTC screen stream.
pub struct StreamManager {
    capture: Arc<dyn ScreenCapture>,
    streams: tokio::sync::Mutex<HashMap<String, StreamEntry>>,
}

impl StreamManager {
    pub fn new(capture: Arc<dyn ScreenCapture>) -> Self {
        Self { capture, streams: tokio::sync::Mutex::new(HashMap::new()) }
    }

    /// Creates a peer connection, opens the `"frames"` data channel, and
    /// returns a local SDP offer the caller relays to the remote peer.
    pub async fn start(
        &self,
        target_fps: u32,
        jpeg_quality: u8,
        monitor_index: i32,
    ) -> Result<(String, String), DomainError> {
        let monitor_count = self.capture.monitor_count().await;
        if monitor_index < 0 || monitor_index as usize >= monitor_count {
            return Err(DomainError::invalid_argument(format!(
                "monitor_index {monitor_index} out of range (0..{monitor_count})"
            )));
        }

        let api = APIBuilder::new().build();
        let config = RTCConfiguration { ice_servers: vec![], ..Default::default() };
        let pc = Arc::new(
            api.new_peer_connection(config)
                .await
                .map_err(|e| DomainError::internal(format!("failed to create peer connection: {e}")))?,
        );

        let channel = pc
            .create_data_channel("frames", None)
            .await
            .map_err(|e| DomainError::internal(format!("failed to create data channel: {e}")))?;

        let offer = pc
            .create_offer(None)
            .await
            .map_err(|e| DomainError::internal(format!("failed to create offer: {e}")))?;

        let mut gather_complete = pc.gathering_complete_promise().await;
        pc.set_local_description(offer)
            .await
            .map_err(|e| DomainError::internal(format!("failed to set local description: {e}")))?;

        tokio::time::timeout(ICE_GATHER_TIMEOUT, gather_complete.recv())
            .await
            .map_err(|_| DomainError::timeout("ICE candidate gathering timed out"))?;

        let local = pc
            .local_description()
            .await
            .ok_or_else(|| DomainError::internal("peer connection has no local description after gathering"))?;

        let stream_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();

        self.spawn_capture_loop(
            stream_id.clone(),
            Arc::clone(&channel),
            cancel.clone(),
            target_fps.max(1),
            if jpeg_quality == 0 { DEFAULT_JPEG_QUALITY } else { jpeg_quality.min(100) },
            monitor_index,
        );

        self.streams.lock().await.insert(stream_id.clone(), StreamEntry { peer_connection: pc, cancel });

        Ok((stream_id, local.sdp))
    }

    /// Applies the remote SDP answer to complete negotiation.
    pub async fn answer(&self, stream_id: &str, answer_sdp: &str) -> Result<(), DomainError> {
        let streams = self.streams.lock().await;
        let entry = streams.get(stream_id).ok_or_else(|| DomainError::not_found("unknown stream"))?;
        let answer = RTCSessionDescription::answer(answer_sdp.to_string())
            .map_err(|e| DomainError::invalid_argument(format!("invalid answer SDP: {e}")))?;
        entry
            .peer_connection
            .set_remote_description(answer)
            .await
            .map_err(|e| DomainError::internal(format!("failed to set remote description: {e}")))?;
        Ok(())
    }

    /// Cancels the capture loop and tears down the peer connection.
    pub async fn stop(&self, stream_id: &str) -> Result<(), DomainError> {
        let entry = self.streams.lock().await.remove(stream_id).ok_or_else(|| DomainError::not_found("unknown stream"))?;
        entry.cancel.cancel();
        let _ = entry.peer_connection.close().await;
        Ok(())
    }

    fn spawn_capture_loop(
        &self,
        stream_id: String,
        channel: Arc<RTCDataChannel>,
        cancel: CancellationToken,
        target_fps: u32,
        jpeg_quality: u8,
        monitor_index: i32,
    ) {
        let capture = Arc::clone(&self.capture);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / target_fps as f64));
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(stream_id = %stream_id, "capture loop cancelled");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                let Some(frame) = capture.capture(monitor_index).await else {
                    continue;
                };

                let Some(bytes) = encode_frame(&frame, jpeg_quality) else {
                    debug!(stream_id = %stream_id, "dropping oversize frame after rescale attempts");
                    continue;
                };

                if let Err(e) = channel.send(&Bytes::from(bytes)).await {
                    warn!(stream_id = %stream_id, error = %e, "data channel send failed, stopping capture loop");
                    return;
                }
            }
        });
    }
}

#[path = "stream_tests.rs"]
#[cfg(test)]
mod stream_tests;
