//! # HTTP Server Module
//!
//! Enrich-and-forward adapter: every request is run through the claim
//! projector and then proxied to the configured upstream with reqwest. The
//! upstream response (status, headers, body) is relayed back unchanged.
//!
//! Enrichment never fails a request. Only forwarding does: an unreadable body
//! is a 400, an unreachable upstream a 502 and an upstream timeout a 504.
//!
//! ## Rust Concepts Used
//!
//! - `Arc<T>` for sharing the projector and cache across async tasks
//! - axum `State` extractor with a `Clone` state struct
//! - `Result<Response, GatewayError>` handlers, converted via `IntoResponse`
//! - `tokio::net::TcpListener` plus `axum::serve` with graceful shutdown

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router as AxumRouter,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::auth::projector::{ClaimProjector, ProjectorSettings};
use crate::caching::tenant_groups::TenantGroupCache;
use crate::core::config::GatewayConfig;
use crate::core::error::{GatewayError, GatewayResult};

/// Hop-by-hop headers that must not be forwarded in either direction
static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Claim projector (owns the shared tenant group cache)
    pub projector: Arc<ClaimProjector>,

    /// HTTP client for upstream requests
    pub client: reqwest::Client,

    /// Base URL of the upstream
    pub upstream: Url,

    /// Maximum request body size buffered before forwarding
    pub max_body_size: usize,

    /// Timeout for one upstream round trip
    pub upstream_timeout: Duration,
}

impl ServerState {
    /// Create server state from configuration and an already constructed cache
    pub fn new(config: &GatewayConfig, cache: Arc<TenantGroupCache>) -> GatewayResult<Self> {
        let upstream_url = config
            .server
            .upstream_url
            .as_deref()
            .ok_or_else(|| GatewayError::config("Upstream URL is not configured"))?;
        let upstream = Url::parse(upstream_url)
            .map_err(|e| GatewayError::config(format!("Invalid upstream URL '{}': {}", upstream_url, e)))?;

        let settings = ProjectorSettings::from_config(&config.auth)?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to build upstream client: {}", e)))?;

        Ok(Self {
            projector: Arc::new(ClaimProjector::new(cache, settings)),
            client,
            upstream,
            max_body_size: config.server.max_body_size,
            upstream_timeout: config.server.upstream_timeout,
        })
    }
}

/// Build the gateway router: health endpoint plus the forwarding fallback
pub fn build_router(state: ServerState) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health_check))
        .fallback(forward_request)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Main gateway server
pub struct GatewayServer {
    bind_addr: SocketAddr,
    app: AxumRouter,
}

impl GatewayServer {
    /// Create a new gateway server
    pub fn new(config: &GatewayConfig, cache: Arc<TenantGroupCache>) -> GatewayResult<Self> {
        let state = ServerState::new(config, cache)?;

        Ok(Self {
            bind_addr: config.server.bind_address,
            app: build_router(state),
        })
    }

    /// Get gateway server bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Router serving this gateway, for embedding or tests
    pub fn router(&self) -> AxumRouter {
        self.app.clone()
    }

    /// Start serving until Ctrl-C
    pub async fn start(self) -> GatewayResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await.map_err(|e| {
            GatewayError::internal(format!("Failed to bind gateway server to {}: {}", self.bind_addr, e))
        })?;

        info!("Gateway HTTP server listening on {}", self.bind_addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::internal(format!("Gateway server error: {}", e)))?;

        info!("Gateway HTTP server stopped");
        Ok(())
    }
}

/// Enrich the request with claim headers and forward it upstream
#[instrument(skip(state, request), fields(method = %request.method(), path = %request.uri().path()))]
async fn forward_request(State(state): State<ServerState>, request: Request) -> Result<Response, GatewayError> {
    let (mut parts, body) = request.into_parts();

    let enrichment = state.projector.enrich(&mut parts.headers).await;
    debug!(
        tenant_id = enrichment.tenant_id.as_deref().unwrap_or(""),
        has_groups = enrichment.groups.is_some(),
        "Request enriched"
    );

    let body = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(|e| GatewayError::validation("body", format!("Failed to read request body: {}", e)))?;

    let target = upstream_target(&state.upstream, &parts.uri);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    let upstream_response = state
        .client
        .request(parts.method, target)
        .headers(headers)
        .body(body)
        .timeout(state.upstream_timeout)
        .send()
        .await
        .map_err(|e| upstream_error(&e, state.upstream_timeout))?;

    let status = upstream_response.status();
    let mut response_headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let bytes = upstream_response
        .bytes()
        .await
        .map_err(|e| upstream_error(&e, state.upstream_timeout))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

/// Health check endpoint
pub async fn health_check(State(state): State<ServerState>) -> impl IntoResponse {
    let cache = state.projector.cache();

    Json(json!({
        "status": "healthy",
        "cached_group_names": cache.cached_name_count(),
        "tracked_tenants": cache.tracked_tenant_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Join the upstream base URL with the incoming path and query
fn upstream_target(upstream: &Url, uri: &Uri) -> Url {
    let mut target = upstream.clone();
    let path = format!("{}{}", upstream.path().trim_end_matches('/'), uri.path());
    target.set_path(&path);
    target.set_query(uri.query());
    target
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

fn upstream_error(err: &reqwest::Error, timeout: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        warn!(error = %err, "Upstream request failed");
        GatewayError::HttpClient {
            message: err.to_string(),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
