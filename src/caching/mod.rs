//! # Caching Module
//!
//! Process-lifetime caches used while enriching requests.
//!
//! ## Architecture
//! 1. **Tenant Group Cache**: group id -> display name, refreshed per tenant on
//!    a lazy staleness policy from the directory resolver
//!
//! ## Usage Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tenant_groups_gateway::auth::GraphDirectoryResolver;
//! use tenant_groups_gateway::caching::{CacheSettings, TenantGroupCache};
//! use tenant_groups_gateway::core::config::DirectoryConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DirectoryConfig::default();
//! let resolver = Arc::new(GraphDirectoryResolver::from_config(&config)?);
//! let cache = TenantGroupCache::new(resolver, CacheSettings::from_config(&config));
//!
//! cache.ensure_fresh("tenant-id").await;
//! let names = cache.lookup_all(["group-a", "group-b"]);
//! # Ok(())
//! # }
//! ```

pub mod tenant_groups;

pub use tenant_groups::{CacheSettings, Freshness, TenantGroupCache};
