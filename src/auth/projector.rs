//! # Claim Projector
//!
//! Builds the outbound identity headers for one request from its bearer token
//! claims and the tenant group cache.
//!
//! Enrichment is best effort and fails open: a missing or undecodable token, a
//! token without a tenant, or a directory outage only means fewer headers. The
//! projector never touches headers outside its fixed set.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, FROM};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::claims::{normalize_token, TokenClaims};
use crate::caching::tenant_groups::TenantGroupCache;
use crate::core::config::AuthConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::observability::metrics;

/// Tenant id header (hyphens replaced with underscores)
pub const TENANT_ID_HEADER: &str = "x-tenant-id";
/// Resolved group display names
pub const USER_GROUPS_HEADER: &str = "x-auth-user-groups";
/// Role claim values
pub const USER_ROLES_HEADER: &str = "x-auth-user-roles";
/// User identity
pub const USER_IDENTITY_HEADER: &str = "from";

/// Separator for multi-valued headers
pub const VALUE_SEPARATOR: &str = ",";

/// Token extraction settings for the projector
#[derive(Debug, Clone)]
pub struct ProjectorSettings {
    /// Header carrying the token
    pub token_header: HeaderName,
    /// Prefix stripped before decoding
    pub token_prefix: String,
    /// Skip group resolution, still emit tenant, roles and identity
    pub group_transform_disabled: bool,
}

impl Default for ProjectorSettings {
    fn default() -> Self {
        Self {
            token_header: axum::http::header::AUTHORIZATION,
            token_prefix: crate::core::config::DEFAULT_TOKEN_PREFIX.to_string(),
            group_transform_disabled: false,
        }
    }
}

impl ProjectorSettings {
    pub fn from_config(config: &AuthConfig) -> GatewayResult<Self> {
        let token_header = HeaderName::from_bytes(config.token_header.trim().as_bytes()).map_err(|e| {
            GatewayError::config(format!("Invalid token header name '{}': {}", config.token_header, e))
        })?;

        Ok(Self {
            token_header,
            token_prefix: config.token_prefix.clone(),
            group_transform_disabled: config.group_transform_disabled,
        })
    }
}

/// Headers derived from one request's claims
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentHeaders {
    pub tenant_id: Option<String>,
    pub groups: Option<String>,
    pub roles: Option<String>,
    pub identity: Option<String>,
}

impl EnrichmentHeaders {
    pub fn is_empty(&self) -> bool {
        self.tenant_id.is_none() && self.groups.is_none() && self.roles.is_none() && self.identity.is_none()
    }

    /// Write the present values into `headers`, replacing only this fixed set
    pub fn apply(&self, headers: &mut HeaderMap) {
        let entries = [
            (HeaderName::from_static(TENANT_ID_HEADER), &self.tenant_id),
            (HeaderName::from_static(USER_GROUPS_HEADER), &self.groups),
            (HeaderName::from_static(USER_ROLES_HEADER), &self.roles),
            (FROM, &self.identity),
        ];

        for (name, value) in entries {
            let Some(value) = value else { continue };
            match HeaderValue::from_str(value) {
                Ok(header_value) => {
                    headers.insert(name, header_value);
                }
                Err(_) => warn!(header = %name, "Skipping enrichment header with invalid value"),
            }
        }
    }
}

/// Projects token claims plus cached group names into outbound headers
#[derive(Debug)]
pub struct ClaimProjector {
    cache: Arc<TenantGroupCache>,
    settings: ProjectorSettings,
}

impl ClaimProjector {
    pub fn new(cache: Arc<TenantGroupCache>, settings: ProjectorSettings) -> Self {
        Self { cache, settings }
    }

    pub fn cache(&self) -> &Arc<TenantGroupCache> {
        &self.cache
    }

    pub fn settings(&self) -> &ProjectorSettings {
        &self.settings
    }

    /// Extract and normalize the token from the configured header
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let raw = headers.get(&self.settings.token_header)?.to_str().ok()?;
        normalize_token(raw, &self.settings.token_prefix)
    }

    /// Compute the enrichment headers for a request's headers
    pub async fn project(&self, headers: &HeaderMap) -> EnrichmentHeaders {
        let Some(token) = self.extract_token(headers) else {
            metrics::record_enrichment(metrics::OUTCOME_NO_TOKEN);
            return EnrichmentHeaders::default();
        };

        let claims = TokenClaims::decode(&token);
        self.project_claims(&claims).await
    }

    /// Compute the enrichment headers for already decoded claims
    pub async fn project_claims(&self, claims: &TokenClaims) -> EnrichmentHeaders {
        let Some(tenant_id) = claims.tenant_id() else {
            metrics::record_enrichment(metrics::OUTCOME_NO_TENANT);
            debug!("Token carries no tenant claim, skipping enrichment");
            return EnrichmentHeaders::default();
        };

        let groups = if self.settings.group_transform_disabled {
            None
        } else {
            self.cache.ensure_fresh(tenant_id).await;
            join_values(self.cache.lookup_all(claims.groups()))
        };

        metrics::record_enrichment(metrics::OUTCOME_ENRICHED);

        EnrichmentHeaders {
            tenant_id: Some(tenant_id.replace('-', "_")),
            groups,
            roles: join_values(claims.roles()),
            identity: Some(claims.user_identity().to_string()),
        }
    }

    /// Project and apply in one step
    pub async fn enrich(&self, headers: &mut HeaderMap) -> EnrichmentHeaders {
        let enrichment = self.project(headers).await;
        enrichment.apply(headers);
        enrichment
    }
}

fn join_values<S: AsRef<str>>(values: Vec<S>) -> Option<String> {
    if values.is_empty() {
        return None;
    }

    let joined = values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(VALUE_SEPARATOR);
    Some(joined)
}
