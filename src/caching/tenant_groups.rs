//! # Tenant Group Cache
//!
//! Process-lifetime cache mapping directory group ids to display names, with a
//! freshness record per tenant that drives lazy, request-triggered refreshes.
//!
//! ## Refresh policy
//!
//! `ensure_fresh` implements a two-step lazy refresh:
//! 1. no freshness record: resolve now and record the time on success
//! 2. record older than the refresh interval: delete the record only, the
//!    *next* call for that tenant resolves again
//! 3. record within the interval: nothing to do
//!
//! A failed resolution leaves no record, so the following request retries.
//! Failures are logged and never returned to the caller.
//!
//! ## Locking
//!
//! Each tenant gets its own async refresh lock, created on first sight. The
//! lock is held across the directory call, which gives hard at-most-one
//! resolution per tenant while unrelated tenants proceed in parallel. Group
//! names live behind a read-mostly `parking_lot::RwLock`; a populate writes a
//! tenant's whole batch under one write guard so readers never see half of it.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::auth::directory::{DirectoryError, DirectoryGroup, DirectoryResolver};
use crate::core::config::DirectoryConfig;
use crate::observability::metrics;

/// Refresh policy for the cache
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Age after which a tenant's freshness record is evicted
    pub refresh_interval: Duration,

    /// Upper bound for a single directory resolution
    pub resolve_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(120 * 60),
            resolve_timeout: Duration::from_secs(10),
        }
    }
}

impl CacheSettings {
    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            resolve_timeout: config.request_timeout,
        }
    }
}

/// What `ensure_fresh` did for a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Empty tenant id, nothing checked
    Skipped,
    /// Record present and within the refresh interval
    Fresh,
    /// Directory resolved and the cache was populated
    Resolved,
    /// Record was stale and has been removed
    Evicted,
    /// Directory resolution failed, no record was written
    Failed,
}

/// Concurrent per-tenant group name cache
pub struct TenantGroupCache {
    resolver: Arc<dyn DirectoryResolver>,
    settings: CacheSettings,

    /// Group id -> display name, shared by all tenants
    group_names: RwLock<HashMap<String, String>>,

    /// Tenant id -> last successful refresh
    refreshed_at: DashMap<String, Instant>,

    /// Tenant id -> refresh lock
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TenantGroupCache {
    /// Create an empty cache backed by the given resolver
    pub fn new(resolver: Arc<dyn DirectoryResolver>, settings: CacheSettings) -> Self {
        Self {
            resolver,
            settings,
            group_names: RwLock::new(HashMap::new()),
            refreshed_at: DashMap::new(),
            refresh_locks: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Make sure the tenant's groups are resolved according to the refresh policy
    pub async fn ensure_fresh(&self, tenant_id: &str) -> Freshness {
        if tenant_id.is_empty() {
            return Freshness::Skipped;
        }

        let lock = self.refresh_lock(tenant_id);
        let guard = lock.lock().await;

        // Copy out so no map guard is held across the directory call.
        let last_refreshed = self.refreshed_at.get(tenant_id).map(|entry| *entry.value());

        let outcome = match last_refreshed {
            Some(at) if at.elapsed() > self.settings.refresh_interval => {
                self.refreshed_at.remove(tenant_id);
                metrics::record_eviction();
                debug!(tenant_id, "Tenant groups are stale, next request will refresh them");
                Freshness::Evicted
            }
            Some(_) => Freshness::Fresh,
            None => self.resolve(tenant_id).await,
        };
        drop(guard);

        // Unknown or forged tenants must not leave a lock behind. Only the map
        // and this call hold the lock when nobody else is waiting on it.
        if outcome == Freshness::Failed {
            self.refresh_locks
                .remove_if(tenant_id, |_, lock| Arc::strong_count(lock) == 2);
        }

        outcome
    }

    /// Display name for a group id, if any tenant resolution has seen it
    pub fn lookup(&self, group_id: &str) -> Option<String> {
        self.group_names.read().get(group_id).cloned()
    }

    /// Display names for the given ids in input order; unknown ids are dropped
    pub fn lookup_all<I, S>(&self, group_ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = self.group_names.read();
        group_ids
            .into_iter()
            .filter_map(|id| names.get(id.as_ref()).cloned())
            .collect()
    }

    /// Insert or overwrite the given groups and mark the tenant as refreshed now
    pub fn populate<I>(&self, tenant_id: &str, groups: I)
    where
        I: IntoIterator<Item = DirectoryGroup>,
    {
        let cached = {
            let mut names = self.group_names.write();
            for group in groups {
                names.insert(group.id, group.display_name);
            }
            names.len()
        };

        self.refreshed_at.insert(tenant_id.to_string(), Instant::now());
        metrics::set_cached_names(cached);
    }

    /// Whether the tenant has a record that is still within the refresh interval
    pub fn is_fresh(&self, tenant_id: &str) -> bool {
        self.last_refreshed(tenant_id)
            .is_some_and(|at| at.elapsed() <= self.settings.refresh_interval)
    }

    /// Time of the tenant's last successful refresh, if a record exists
    pub fn last_refreshed(&self, tenant_id: &str) -> Option<Instant> {
        self.refreshed_at.get(tenant_id).map(|entry| *entry.value())
    }

    /// Number of group names currently cached across all tenants
    pub fn cached_name_count(&self) -> usize {
        self.group_names.read().len()
    }

    /// Number of tenants with a freshness record
    pub fn tracked_tenant_count(&self) -> usize {
        self.refreshed_at.len()
    }

    /// Number of per-tenant refresh locks currently allocated
    pub fn refresh_lock_count(&self) -> usize {
        self.refresh_locks.len()
    }

    fn refresh_lock(&self, tenant_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.refresh_locks.get(tenant_id) {
            return Arc::clone(lock.value());
        }

        let entry = self
            .refresh_locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    async fn resolve(&self, tenant_id: &str) -> Freshness {
        let timeout = self.settings.resolve_timeout;

        let result = match tokio::time::timeout(timeout, self.resolver.list_groups(tenant_id)).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        match result {
            Ok(groups) => {
                let group_count = groups.len();
                self.populate(tenant_id, groups);
                metrics::record_resolution(metrics::OUTCOME_SUCCESS);
                info!(tenant_id, group_count, "Resolved tenant groups");
                Freshness::Resolved
            }
            Err(err) => {
                metrics::record_resolution(metrics::OUTCOME_FAILURE);
                error!(tenant_id, error = %err, "Unable to resolve tenant groups");
                Freshness::Failed
            }
        }
    }
}

impl std::fmt::Debug for TenantGroupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantGroupCache")
            .field("settings", &self.settings)
            .field("cached_names", &self.cached_name_count())
            .field("tracked_tenants", &self.tracked_tenant_count())
            .finish()
    }
}
