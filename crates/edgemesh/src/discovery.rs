//! LAN-wide UDP broadcast presence protocol.
//!
//! A single shared socket drives three cooperating flows: periodic
//! announce, non-blocking listen, and stale-entry cleanup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::device::DeviceInfo;
use crate::registry::Registry;

const MAX_DATAGRAM_BYTES: usize = 1024;
const RECV_BUF_SIZE: usize = 2048;
const STALE_AFTER: Duration = Duration::from_secs(30);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(10);
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Announce,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryMessage {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub version: u32,
    pub ts: i64,
    pub device: DeviceInfo,
}

impl DiscoveryMessage {
    pub fn announce(device: DeviceInfo) -> Self {
        Self { msg_type: MessageType::Announce, version: 1, ts: crate::registry::now_unix_ms(), device }
    }

    pub fn leave(device: DeviceInfo) -> Self {
        Self { msg_type: MessageType::Leave, version: 1, ts: crate::registry::now_unix_ms(), device }
    }
}

/// Callback invoked when the cleanup sweep evicts a device.
pub type OnDeviceLeft = Arc<dyn Fn(String) + Send + Sync>;

pub struct Discovery {
    socket: Arc<UdpSocket>,
    registry: Arc<Registry>,
    self_device: DeviceInfo,
    seed_peers: Vec<String>,
    announce_interval: Duration,
    on_device_left: Option<OnDeviceLeft>,
}

impl Discovery {
    pub async fn bind(
        port: u16,
        registry: Arc<Registry>,
        self_device: DeviceInfo,
        seed_peers: Vec<String>,
        announce_interval: Duration,
        on_device_left: Option<OnDeviceLeft>,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket: Arc::new(socket),
            registry,
            self_device,
            seed_peers,
            announce_interval,
            on_device_left,
        })
    }

    /// Spawns announce, listen, and cleanup loops, all cancelled by `token`.
    pub fn spawn(self: Arc<Self>, port: u16, token: CancellationToken) {
        let announcer = Arc::clone(&self);
        let announce_token = token.clone();
        tokio::spawn(async move { announcer.run_announcer(port, announce_token).await });

        let listener = Arc::clone(&self);
        let listen_token = token.clone();
        tokio::spawn(async move { listener.run_listener(listen_token).await });

        let cleaner = Arc::clone(&self);
        tokio::spawn(async move { cleaner.run_cleanup(token).await });
    }

    async fn run_announcer(&self, port: u16, token: CancellationToken) {
        self.send_announce(port).await;
        let mut ticker = tokio::time::interval(self.announce_interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    self.send_leave(port).await;
                    return;
                }
                _ = ticker.tick() => {
                    self.send_announce(port).await;
                }
            }
        }
    }

    async fn send_announce(&self, port: u16) {
        self.broadcast(&DiscoveryMessage::announce(self.self_device.clone()), port).await;
    }

    async fn send_leave(&self, port: u16) {
        self.broadcast(&DiscoveryMessage::leave(self.self_device.clone()), port).await;
    }

    async fn broadcast(&self, message: &DiscoveryMessage, port: u16) {
        let payload = match serde_json::to_vec(message) {
            Ok(p) => p,
            Err(e) => {
                warn!(err = %e, "failed to encode discovery message");
                return;
            }
        };
        if payload.len() > MAX_DATAGRAM_BYTES {
            warn!(len = payload.len(), "discovery message exceeds wire budget, dropping");
            return;
        }

        let mut targets = broadcast_addresses(port);
        for peer in &self.seed_peers {
            if let Ok(addr) = peer.parse::<SocketAddr>() {
                targets.push(addr);
            }
        }

        for addr in targets {
            if let Err(e) = self.socket.send_to(&payload, addr).await {
                // UDP transmit errors are downgraded to debug logs;
                // the socket is not reopened on a per-send failure.
                debug!(err = %e, %addr, "discovery send failed");
            }
        }
    }

    async fn run_listener(&self, token: CancellationToken) {
        let mut buf = [0u8; RECV_BUF_SIZE];
        loop {
            if token.is_cancelled() {
                return;
            }
            let recv = tokio::time::timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf)).await;
            match recv {
                Err(_elapsed) => continue, // timeout: loop back to check cancellation
                Ok(Err(e)) => {
                    warn!(err = %e, "discovery recv failed, retrying");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    continue;
                }
                Ok(Ok((n, src))) => {
                    self.handle_datagram(&buf[..n], src).await;
                }
            }
        }
    }

    async fn handle_datagram(&self, data: &[u8], src: SocketAddr) {
        let message: DiscoveryMessage = match serde_json::from_slice(data) {
            Ok(m) => m,
            Err(_) => return, // unknown/malformed payloads are silently ignored
        };

        if message.device.device_id == self.self_device.device_id {
            return;
        }

        match message.msg_type {
            MessageType::Announce => {
                let mut device = message.device;
                if device.host_is_sentinel() {
                    device = device.with_rewritten_host(&src.ip().to_string());
                }
                if let Err(e) = self.registry.upsert(device).await {
                    warn!(err = %e, "rejected malformed discovery announce");
                }
            }
            MessageType::Leave => {
                self.registry.remove(&message.device.device_id).await;
                if let Some(cb) = &self.on_device_left {
                    cb(message.device.device_id);
                }
            }
        }
    }

    async fn run_cleanup(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => {
                    let evicted = self.registry.evict_stale(STALE_AFTER.as_millis() as i64).await;
                    if let Some(cb) = &self.on_device_left {
                        for id in evicted {
                            cb(id);
                        }
                    }
                }
            }
        }
    }
}

/// Enumerate directed broadcast addresses for every UP, non-loopback IPv4
/// interface (`ip | ~mask`), falling back to the limited broadcast address.
pub fn broadcast_addresses(port: u16) -> Vec<SocketAddr> {
    let mut addrs = Vec::new();

    for iface in netdev::get_interfaces() {
        if !iface.is_up() || iface.is_loopback() {
            continue;
        }
        for net in &iface.ipv4 {
            let ip_u32 = u32::from(net.addr());
            let mask_u32 = u32::from(net.netmask());
            let broadcast = Ipv4Addr::from(ip_u32 | !mask_u32);
            addrs.push(SocketAddr::new(IpAddr::V4(broadcast), port));
        }
    }

    if addrs.is_empty() {
        addrs.push(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(255, 255, 255, 255)), port));
    }

    addrs
}

#[path = "discovery_tests.rs"]
#[cfg(test)]
mod discovery_tests;
