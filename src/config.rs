//! Engine configuration from the environment

use crate::scheduler::default_flush_at;
use chrono::NaiveTime;
use log::warn;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVariable(String),
}

/// Runtime settings for the engine process.
///
/// `VITALINK_TRANSPORT` names the device path to read frames from and is
/// required only when the CLI actually starts ingestion.
/// `VITALINK_FLUSH_AT` is the daily flush time as `HH:MM` (local clock);
/// an invalid value falls back to the default with a warning rather than
/// refusing to start.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub transport: Option<String>,
    pub flush_at: NaiveTime,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let transport = env::var("VITALINK_TRANSPORT").ok();

        let flush_at = match env::var("VITALINK_FLUSH_AT") {
            Ok(raw) => match NaiveTime::parse_from_str(&raw, "%H:%M") {
                Ok(time) => time,
                Err(_) => {
                    warn!(
                        "invalid VITALINK_FLUSH_AT '{}', defaulting to {}",
                        raw,
                        default_flush_at().format("%H:%M")
                    );
                    default_flush_at()
                }
            },
            Err(_) => default_flush_at(),
        };

        Self {
            transport,
            flush_at,
        }
    }

    /// The transport path, required for ingestion
    pub fn require_transport(&self) -> Result<&str, ConfigError> {
        self.transport
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("VITALINK_TRANSPORT".to_string()))
    }
}
