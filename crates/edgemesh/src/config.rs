//! Coordinator/worker process configuration.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[command(name = "edgemesh", version, about = "LAN mesh compute orchestrator.")]
pub struct Config {
    /// Address the gRPC server binds to.
    #[arg(long, env = "GRPC_ADDR", default_value = "0.0.0.0:50051")]
    pub grpc_addr: String,

    /// Address the HTTP API server binds to.
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    /// UDP port used for LAN discovery announce/listen.
    ///
    /// Defaults to the gRPC port on the assumption that coordinator and
    /// discovery are colocated; override independently otherwise.
    #[arg(long, env = "DISC_PORT", default_value_t = 50051)]
    pub disc_port: u16,

    /// Seed peer addresses (host:disc_port) to announce to directly, in
    /// addition to broadcast.
    #[arg(long, env = "SEED_PEERS", value_delimiter = ',')]
    pub seed_peers: Vec<String>,

    /// Interval between discovery announcements, in seconds.
    #[arg(long, env = "ANNOUNCE_INTERVAL_SECS", default_value_t = 5)]
    pub announce_interval_secs: u64,

    /// Whether to route plan generation through the external LLM.
    #[arg(long, env = "USE_LLM_PLANNER", default_value_t = false)]
    pub use_llm_planner: bool,

    /// Base URL of the OpenAI-compatible chat completion endpoint.
    #[arg(long, env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// Model name to request from the LLM endpoint.
    #[arg(long, env = "LLM_MODEL")]
    pub llm_model: Option<String>,

    /// API key for the LLM endpoint. Never logged.
    #[arg(long, env = "LLM_API_KEY")]
    pub llm_api_key: Option<String>,

    /// Shared pre-shared key required by `CreateSession`. Any
    /// non-empty value is accepted if unset.
    #[arg(long, env = "SESSION_SECURITY_KEY")]
    pub session_security_key: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.grpc_addr.is_empty() {
            anyhow::bail!("grpc_addr must not be empty");
        }
        if self.http_addr.is_empty() {
            anyhow::bail!("http_addr must not be empty");
        }
        Ok(())
    }

    /// Path to the persisted device identity file.
    pub fn device_id_path() -> PathBuf {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        home.join(".edgemesh").join("device_id")
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "grpc={} http={} disc_port={} use_llm_planner={}",
            self.grpc_addr, self.http_addr, self.disc_port, self.use_llm_planner
        )
    }
}

/// Load or create the persisted local device id.
pub fn load_or_create_device_id() -> anyhow::Result<String> {
    let path = Config::device_id_path();
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &id)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(&path, perms)?;
    }
    Ok(id)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
