//! # Configuration Module
//!
//! Layered configuration for the gateway: built-in defaults, an optional YAML
//! file, then `GATEWAY_*` environment variable overrides on top.
//!
//! ## Key Features
//! - YAML parsing with serde (every section is optional)
//! - Environment variable override support
//! - Lenient handling of the group refresh interval: an unparsable value falls
//!   back to the default with a warning instead of aborting startup
//! - Startup validation that reports missing directory credentials

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

use crate::core::error::{GatewayError, GatewayResult};

/// Header carrying the bearer token when none is configured
pub const DEFAULT_TOKEN_HEADER: &str = "Authorization";

/// Prefix stripped from the token header value when none is configured
pub const DEFAULT_TOKEN_PREFIX: &str = "Bearer";

/// Group refresh interval used when none (or an invalid one) is configured
pub const DEFAULT_REFRESH_INTERVAL_MINUTES: f64 = 120.0;

/// Environment variable naming an optional YAML configuration file
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";

/// Main gateway configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and upstream forwarding settings
    pub server: ServerConfig,

    /// Token extraction and enrichment settings
    pub auth: AuthConfig,

    /// Directory service credentials and group refresh policy
    pub directory: DirectoryConfig,

    /// Metrics exporter settings
    pub observability: ObservabilityConfig,
}

/// Listener and forwarding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the gateway listens on
    pub bind_address: SocketAddr,

    /// Base URL requests are forwarded to after enrichment
    pub upstream_url: Option<String>,

    /// Maximum request body buffered before forwarding
    pub max_body_size: usize,

    /// Timeout for a single upstream round trip
    #[serde(with = "humantime_serde")]
    pub upstream_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            upstream_url: None,
            max_body_size: 16 * 1024 * 1024,
            upstream_timeout: Duration::from_secs(30),
        }
    }
}

/// Token extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header name to extract the token from
    pub token_header: String,

    /// Token prefix to strip (e.g., "Bearer")
    pub token_prefix: String,

    /// Skip tenant group resolution entirely (tenant id and identity are still emitted)
    pub group_transform_disabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
            group_transform_disabled: false,
        }
    }
}

/// Directory service configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Application (client) id used for the client-credentials grant
    pub client_id: Option<String>,

    /// Client secret used for the client-credentials grant
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,

    /// Minutes after which a tenant's cached groups are considered stale
    pub refresh_interval_minutes: f64,

    /// Upper bound for one directory resolution (token + listing)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// OAuth2 authority base URL
    pub authority_url: String,

    /// Graph API base URL
    pub graph_url: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
            request_timeout: Duration::from_secs(10),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            graph_url: DEFAULT_GRAPH_URL.to_string(),
        }
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_interval_minutes", &self.refresh_interval_minutes)
            .field("request_timeout", &self.request_timeout)
            .field("authority_url", &self.authority_url)
            .field("graph_url", &self.graph_url)
            .finish()
    }
}

impl DirectoryConfig {
    /// Refresh interval as a `Duration`
    ///
    /// Values that cannot be represented (negative, NaN, infinite, too large)
    /// fall back to the default interval.
    pub fn refresh_interval(&self) -> Duration {
        interval_duration(self.refresh_interval_minutes)
            .or_else(|| interval_duration(DEFAULT_REFRESH_INTERVAL_MINUTES))
            .unwrap_or(Duration::from_secs(120 * 60))
    }

    /// Whether both halves of the client credentials are present
    pub fn has_credentials(&self) -> bool {
        matches!((&self.client_id, &self.client_secret), (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty())
    }
}

/// Observability configuration
///
/// Log level and format are read from the environment before configuration
/// loading starts (see `observability::logging::init_from_env`), so only the
/// metrics exporter lives here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Address for the Prometheus scrape endpoint; disabled when absent
    pub metrics_address: Option<SocketAddr>,
}

impl GatewayConfig {
    /// Load configuration from `GATEWAY_CONFIG` if set, otherwise from defaults
    /// and environment variables only
    pub async fn load() -> GatewayResult<Self> {
        match non_empty(env::var(CONFIG_PATH_ENV).ok()) {
            Some(path) => Self::load_from_file(path).await,
            None => Self::from_env(),
        }
    }

    /// Load configuration from a YAML file, then apply environment overrides
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| GatewayError::config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text without applying overrides
    pub fn from_yaml(content: &str) -> GatewayResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| GatewayError::config(format!("Failed to parse config: {}", e)))
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> GatewayResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    ///
    /// Environment variables follow the pattern: GATEWAY_<SECTION>_<FIELD>
    pub fn apply_env_overrides(&mut self) -> GatewayResult<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> GatewayResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        // Directory credentials and refresh policy
        if let Some(client_id) = get("GATEWAY_DIRECTORY_CLIENT_ID") {
            self.directory.client_id = Some(client_id);
        }

        if let Some(client_secret) = get("GATEWAY_DIRECTORY_CLIENT_SECRET") {
            self.directory.client_secret = Some(client_secret);
        }

        if let Some(minutes) = get("GATEWAY_GROUP_REFRESH_MINUTES") {
            self.directory.refresh_interval_minutes = parse_refresh_minutes(&minutes);
        }

        if let Some(timeout) = get("GATEWAY_DIRECTORY_TIMEOUT") {
            self.directory.request_timeout = humantime::parse_duration(&timeout)
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_DIRECTORY_TIMEOUT: {}", e)))?;
        }

        if let Some(url) = get("GATEWAY_DIRECTORY_AUTHORITY_URL") {
            self.directory.authority_url = url;
        }

        if let Some(url) = get("GATEWAY_DIRECTORY_GRAPH_URL") {
            self.directory.graph_url = url;
        }

        // Token extraction
        if let Some(header) = lookup("GATEWAY_AUTH_TOKEN_HEADER") {
            self.auth.token_header = header;
        }

        if let Some(prefix) = lookup("GATEWAY_AUTH_TOKEN_PREFIX") {
            self.auth.token_prefix = prefix;
        }

        if let Some(disabled) = get("GATEWAY_GROUP_TRANSFORM_DISABLE") {
            self.auth.group_transform_disabled = disabled.trim().eq_ignore_ascii_case("true");
        }

        // Server
        if let Some(addr) = get("GATEWAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_SERVER_BIND_ADDRESS: {}", e)))?;
        }

        if let Some(url) = get("GATEWAY_UPSTREAM_URL") {
            self.server.upstream_url = Some(url);
        }

        if let Some(size) = get("GATEWAY_SERVER_MAX_BODY_SIZE") {
            self.server.max_body_size = size
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_SERVER_MAX_BODY_SIZE: {}", e)))?;
        }

        if let Some(timeout) = get("GATEWAY_UPSTREAM_TIMEOUT") {
            self.server.upstream_timeout = humantime::parse_duration(&timeout)
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_UPSTREAM_TIMEOUT: {}", e)))?;
        }

        // Observability
        if let Some(addr) = get("GATEWAY_METRICS_ADDRESS") {
            self.observability.metrics_address = Some(
                addr.parse()
                    .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_METRICS_ADDRESS: {}", e)))?,
            );
        }

        Ok(())
    }

    /// Validate the configuration and report startup status
    ///
    /// Missing directory credentials are reported but not fatal: the gateway
    /// still forwards requests, and every group resolution fails and is logged.
    pub fn validate(&mut self) -> GatewayResult<()> {
        if self.auth.token_header.trim().is_empty() {
            self.auth.token_header = DEFAULT_TOKEN_HEADER.to_string();
            warn!(
                token_header = DEFAULT_TOKEN_HEADER,
                "No token header name set, using default"
            );
        }

        if !is_valid_interval(self.directory.refresh_interval_minutes) {
            warn!(
                value = self.directory.refresh_interval_minutes,
                default_minutes = DEFAULT_REFRESH_INTERVAL_MINUTES,
                "Invalid group refresh interval, using default"
            );
            self.directory.refresh_interval_minutes = DEFAULT_REFRESH_INTERVAL_MINUTES;
        }

        match &self.server.upstream_url {
            Some(url) => {
                Url::parse(url)
                    .map_err(|e| GatewayError::config(format!("Invalid upstream URL '{}': {}", url, e)))?;
            }
            None => return Err(GatewayError::config("Upstream URL is not configured (GATEWAY_UPSTREAM_URL)")),
        }

        if self.auth.group_transform_disabled {
            info!("Group transformation is disabled");
        } else if !self.directory.has_credentials() {
            error!("Unable to retrieve directory credentials: GATEWAY_DIRECTORY_CLIENT_ID or GATEWAY_DIRECTORY_CLIENT_SECRET missing");
        } else {
            info!(
                token_header = %self.auth.token_header,
                refresh_interval_minutes = self.directory.refresh_interval_minutes,
                "Tenant group enrichment configured"
            );
        }

        Ok(())
    }
}

/// Parse the refresh interval in minutes, falling back to the default on failure
fn parse_refresh_minutes(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(minutes) if is_valid_interval(minutes) => minutes,
        _ => {
            warn!(
                value = raw,
                default_minutes = DEFAULT_REFRESH_INTERVAL_MINUTES,
                "Unable to convert group refresh interval, using default"
            );
            DEFAULT_REFRESH_INTERVAL_MINUTES
        }
    }
}

fn interval_duration(minutes: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(minutes * 60.0).ok()
}

fn is_valid_interval(minutes: f64) -> bool {
    interval_duration(minutes).is_some()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
