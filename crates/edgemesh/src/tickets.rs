//! Single-use, TTL-bounded download authorizations.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use tokio::sync::Mutex;

use crate::registry::now_unix_ms;

const DEFAULT_TTL: Duration = Duration::from_secs(60);
const TOKEN_BYTES: usize = 32; // 256 bits

#[derive(Debug, Clone)]
pub struct DownloadTicket {
    pub token: String,
    pub file_path: String,
    pub filename: String,
    pub size_bytes: u64,
    pub expires_at_unix_ms: i64,
}

/// Mutex-per-manager locking.
pub struct TicketManager {
    tickets: Mutex<HashMap<String, DownloadTicket>>,
    ttl: Duration,
}

impl Default for TicketManager {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl TicketManager {
    pub fn new(ttl: Duration) -> Self {
        Self { tickets: Mutex::new(HashMap::new()), ttl }
    }

    pub async fn create(&self, file_path: impl Into<String>, filename: impl Into<String>, size_bytes: u64) -> DownloadTicket {
        let mut tickets = self.tickets.lock().await;
        sweep_expired(&mut tickets);

        let token = generate_token();
        let ticket = DownloadTicket {
            token: token.clone(),
            file_path: file_path.into(),
            filename: filename.into(),
            size_bytes,
            expires_at_unix_ms: now_unix_ms() + self.ttl.as_millis() as i64,
        };
        tickets.insert(token, ticket.clone());
        ticket
    }

    /// Atomically removes and returns the entry; `None` if absent or expired.
    pub async fn consume(&self, token: &str) -> Option<DownloadTicket> {
        let mut tickets = self.tickets.lock().await;
        let now = now_unix_ms();
        match tickets.remove(token) {
            Some(ticket) if ticket.expires_at_unix_ms >= now => Some(ticket),
            _ => None,
        }
    }
}

fn sweep_expired(tickets: &mut HashMap<String, DownloadTicket>) {
    let now = now_unix_ms();
    tickets.retain(|_, t| t.expires_at_unix_ms >= now);
}

fn generate_token() -> String {
    use rand::Rng;
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[path = "tickets_tests.rs"]
#[cfg(test)]
mod tickets_tests;
