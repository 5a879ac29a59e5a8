//! # Tenant Groups Gateway - Core Library Crate
//!
//! Authentication-context enrichment for an API gateway. Every request that
//! carries a bearer token is decoded, the tenant's directory groups are kept
//! fresh in a shared cache, and the claims are projected into a fixed set of
//! outbound headers (`x-tenant-id`, `x-auth-user-groups`, `x-auth-user-roles`,
//! `from`) before the request is forwarded upstream.
//!
//! ## Module Layout
//!
//! - `core`: error types and configuration
//! - `auth`: claim decoding, the directory resolver and the claim projector
//! - `caching`: the tenant group cache
//! - `gateway`: the enrich-and-forward HTTP server
//! - `observability`: structured logging and metrics
//!
//! ## Re-exports
//! - `pub use` re-exports items from other modules
//! - Users can import commonly used types directly from the crate root

/// Core functionality: error types and configuration
pub mod core;

/// Token claims, directory resolution and the claim projector
pub mod auth;

/// Tenant group cache shared by all requests
pub mod caching;

/// Enrich-and-forward HTTP server
pub mod gateway;

/// Structured logging and Prometheus metrics
pub mod observability;

/// Main error type used throughout the gateway
pub use core::error::{GatewayError, GatewayResult};

/// Main configuration structure for the gateway
pub use core::config::GatewayConfig;

pub use auth::{
    ClaimEnrichmentLayer, ClaimProjector, DirectoryGroup, DirectoryResolver, EnrichmentHeaders,
    GraphDirectoryResolver, ProjectorSettings, TokenClaims,
};
pub use caching::{CacheSettings, Freshness, TenantGroupCache};
pub use gateway::server::GatewayServer;
