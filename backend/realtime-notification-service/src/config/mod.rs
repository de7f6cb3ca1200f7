use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process configuration, read from the environment (and `.env` when present)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated list of origins, or `*`
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,

    /// Upper bound on a single send to one stream during a broadcast
    #[serde(default = "default_stream_send_timeout_ms")]
    pub stream_send_timeout_ms: u64,

    /// Capacity of each stream's outbound queue
    #[serde(default = "default_stream_buffer_size")]
    pub stream_buffer_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8106
}

fn default_cors_allowed_origins() -> String {
    "*".to_string()
}

fn default_stream_send_timeout_ms() -> u64 {
    250
}

fn default_stream_buffer_size() -> usize {
    32
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: default_cors_allowed_origins(),
            stream_send_timeout_ms: default_stream_send_timeout_ms(),
            stream_buffer_size: default_stream_buffer_size(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        envy::from_env::<Config>()?.validated()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)?.validated()
    }

    fn validated(self) -> Result<Self> {
        if self.stream_buffer_size == 0 {
            return Err(AppError::Config(
                "STREAM_BUFFER_SIZE must be greater than zero".to_string(),
            ));
        }
        if self.stream_send_timeout_ms == 0 {
            return Err(AppError::Config(
                "STREAM_SEND_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_send_timeout_ms)
    }

    /// `None` means any origin is allowed
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }
}
