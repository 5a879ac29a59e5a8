//! # Configuration Integration Tests
//!
//! Loading YAML configuration files from disk.

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tenant_groups_gateway::{GatewayConfig, GatewayError};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_load_full_config_file() {
    let file = write_config(
        r#"
server:
  bind_address: "127.0.0.1:8088"
  upstream_url: "http://backend:9000"
  max_body_size: 1048576
  upstream_timeout: 15s
auth:
  token_header: X-Access-Token
  token_prefix: JWT
  group_transform_disabled: false
directory:
  client_id: gateway-app
  client_secret: gateway-secret
  refresh_interval_minutes: 45
  request_timeout: 4s
observability:
  metrics_address: "127.0.0.1:9102"
"#,
    );

    let config = GatewayConfig::load_from_file(file.path()).await.unwrap();

    assert_eq!(config.server.bind_address.port(), 8088);
    assert_eq!(config.server.upstream_url.as_deref(), Some("http://backend:9000"));
    assert_eq!(config.server.max_body_size, 1_048_576);
    assert_eq!(config.server.upstream_timeout, Duration::from_secs(15));
    assert_eq!(config.auth.token_header, "X-Access-Token");
    assert_eq!(config.auth.token_prefix, "JWT");
    assert!(config.directory.has_credentials());
    assert_eq!(config.directory.refresh_interval(), Duration::from_secs(45 * 60));
    assert_eq!(config.directory.request_timeout, Duration::from_secs(4));
    assert_eq!(config.observability.metrics_address.map(|a| a.port()), Some(9102));
}

#[tokio::test]
async fn test_minimal_config_uses_defaults() {
    let file = write_config("server:\n  upstream_url: http://localhost:3000\n");

    let config = GatewayConfig::load_from_file(file.path()).await.unwrap();

    assert_eq!(config.auth.token_header, "Authorization");
    assert_eq!(config.auth.token_prefix, "Bearer");
    assert_eq!(config.directory.refresh_interval(), Duration::from_secs(120 * 60));
    assert!(config.observability.metrics_address.is_none());
}

#[tokio::test]
async fn test_invalid_refresh_interval_falls_back_to_default() {
    let file = write_config(
        "server:\n  upstream_url: http://localhost:3000\ndirectory:\n  refresh_interval_minutes: -10\n",
    );

    let config = GatewayConfig::load_from_file(file.path()).await.unwrap();
    assert_eq!(config.directory.refresh_interval_minutes, 120.0);
}

#[tokio::test]
async fn test_missing_file_is_a_configuration_error() {
    let result = GatewayConfig::load_from_file("/nonexistent/gateway.yaml").await;
    assert!(matches!(result, Err(GatewayError::Configuration { .. })));
}

#[tokio::test]
async fn test_malformed_yaml_is_a_configuration_error() {
    let file = write_config("server: [this is not a mapping");
    let result = GatewayConfig::load_from_file(file.path()).await;
    assert!(matches!(result, Err(GatewayError::Configuration { .. })));
}
