use std::time::Duration;

use clap::Parser;

use crate::signaling::{DEFAULT_HEALTH_PORT, DEFAULT_SIGNALING_PORT, ServerSettings};

/// Signaling relay for peer-to-peer media sessions
#[derive(Parser, Clone, Debug)]
#[command(name = "huddle", version, about = "Signaling relay for peer-to-peer media sessions")]
pub struct Config {
    /// Bind address
    #[arg(long, env = "HUDDLE_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Port to listen on
    #[arg(long, env = "HUDDLE_PORT", default_value_t = DEFAULT_SIGNALING_PORT)]
    pub port: u16,

    /// Port for the HTTP health endpoint (0 disables)
    #[arg(long, env = "HUDDLE_HEALTH_PORT", default_value_t = DEFAULT_HEALTH_PORT)]
    pub health_port: u16,

    /// Seconds between WebSocket pings
    #[arg(long, env = "HUDDLE_PING_INTERVAL_SECS", default_value_t = 30)]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before dropping the connection
    #[arg(long, env = "HUDDLE_PONG_TIMEOUT_SECS", default_value_t = 10)]
    pub pong_timeout_secs: u64,

    /// Seconds between registry stats log lines (0 disables)
    #[arg(long, env = "HUDDLE_STATS_INTERVAL_SECS", default_value_t = 60)]
    pub stats_interval_secs: u64,

    /// Enable structured JSON logging
    #[arg(long, env = "HUDDLE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn health_addr(&self) -> Option<String> {
        (self.health_port > 0).then(|| format!("{}:{}", self.bind_address, self.health_port))
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            ping_interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            pong_timeout: Duration::from_secs(self.pong_timeout_secs.max(1)),
            stats_interval: (self.stats_interval_secs > 0)
                .then(|| Duration::from_secs(self.stats_interval_secs)),
        }
    }
}
