//! Daemon configuration.
//!
//! Precedence: `PORT` (bind port only) > environment (`LINGO_DAEMON_*`) >
//! TOML file at `LINGO_DAEMON_CONFIG` (default `config/daemon.toml`) > defaults.

use crate::error::{DaemonError, DaemonResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/daemon";

/// Constant delay between a worker exit and the next start.
pub const DEFAULT_RESTART_DELAY_SECS: u64 = 5;

fn default_service_name() -> String {
    "Lingo voice service".to_string()
}

fn default_worker_command() -> Vec<String> {
    vec!["lingo-worker".to_string()]
}

fn default_restart_delay_secs() -> u64 {
    DEFAULT_RESTART_DELAY_SECS
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Program and arguments of the supervised voice worker.
    #[serde(default = "default_worker_command")]
    pub worker_command: Vec<String>,
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            worker_command: default_worker_command(),
            restart_delay_secs: default_restart_delay_secs(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl DaemonConfig {
    pub fn load() -> DaemonResult<Self> {
        let path = std::env::var("LINGO_DAEMON_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let built = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("LINGO_DAEMON")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("worker_command"),
            )
            .build()?;

        let mut config: DaemonConfig = built.try_deserialize()?;
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.trim().parse::<u16>().ok()) {
            config.bind_addr = format!("0.0.0.0:{}", port);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DaemonResult<()> {
        match self.worker_command.first() {
            Some(program) if !program.trim().is_empty() => Ok(()),
            _ => Err(DaemonError::Config("worker_command must name a program".to_string())),
        }
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}
