//! Shared helpers for the integration tests: a scriptable directory resolver
//! and unsigned test tokens.

#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tenant_groups_gateway::auth::directory::{DirectoryError, DirectoryResult};
use tenant_groups_gateway::{CacheSettings, DirectoryGroup, DirectoryResolver, TenantGroupCache};

/// In-memory resolver that counts calls and can be told to fail or stall
#[derive(Default)]
pub struct FakeResolver {
    groups: HashMap<String, Vec<DirectoryGroup>>,
    delays: HashMap<String, Duration>,
    failing: AtomicBool,
    calls: AtomicUsize,
    calls_by_tenant: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(mut self, tenant_id: &str, groups: &[(&str, &str)]) -> Self {
        self.groups.insert(
            tenant_id.to_string(),
            groups.iter().map(|(id, name)| DirectoryGroup::new(*id, *name)).collect(),
        );
        self
    }

    pub fn with_delay(mut self, tenant_id: &str, delay: Duration) -> Self {
        self.delays.insert(tenant_id.to_string(), delay);
        self
    }

    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, tenant_id: &str) -> usize {
        self.calls_by_tenant.lock().get(tenant_id).copied().unwrap_or(0)
    }

    /// Highest number of resolutions that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryResolver for FakeResolver {
    async fn list_groups(&self, tenant_id: &str) -> DirectoryResult<Vec<DirectoryGroup>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_tenant.lock().entry(tenant_id.to_string()).or_insert(0) += 1;

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(tenant_id) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(DirectoryError::Listing {
                tenant_id: tenant_id.to_string(),
                status: 503,
                message: "directory unavailable".to_string(),
            });
        }

        Ok(self.groups.get(tenant_id).cloned().unwrap_or_default())
    }
}

/// Cache with the given refresh interval over a fake resolver
pub fn cache_with(resolver: Arc<FakeResolver>, refresh_interval: Duration) -> Arc<TenantGroupCache> {
    Arc::new(TenantGroupCache::new(
        resolver,
        CacheSettings {
            refresh_interval,
            resolve_timeout: Duration::from_secs(5),
        },
    ))
}

/// Compact JWT for the given claims, signed with a key nobody verifies
pub fn token_for(claims: Value) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-signing-key")).unwrap()
}
