//! # Structured Logging
//!
//! Initializes the global `tracing` subscriber. Logging is configured from the
//! environment only, before any configuration file is read, so warnings raised
//! while loading configuration are not lost:
//!
//! - `RUST_LOG` takes precedence when set (full `EnvFilter` syntax)
//! - otherwise `GATEWAY_LOG_LEVEL` (default `info`)
//! - `GATEWAY_LOG_FORMAT` selects `json` (default) or `text` output

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::core::error::{GatewayError, GatewayResult};

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            other => Err(GatewayError::config(format!("Unknown log format: {}", other))),
        }
    }
}

/// Initialize logging from `RUST_LOG`, `GATEWAY_LOG_LEVEL` and `GATEWAY_LOG_FORMAT`
pub fn init_from_env() -> GatewayResult<()> {
    let level = env::var("GATEWAY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let format = match env::var("GATEWAY_LOG_FORMAT") {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::default(),
    };

    init_logging(&level, format)
}

/// Initialize the global subscriber with the given default level and format
pub fn init_logging(level: &str, format: LogFormat) -> GatewayResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(level))
            .map_err(|e| GatewayError::config(format!("Invalid log level '{}': {}", level, e)))?,
    };

    let result = match format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init(),
    };

    result.map_err(|e| GatewayError::internal(format!("Failed to initialize logging: {}", e)))
}

fn default_directives(level: &str) -> String {
    format!("tenant_groups_gateway={level},tower_http=info,{level}", level = level.trim())
}
