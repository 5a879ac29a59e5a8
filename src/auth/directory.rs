//! # Directory Resolver
//!
//! Translates a tenant id plus service credentials into the tenant's
//! `(group id, display name)` pairs.
//!
//! Each call is a single attempt with no internal retry: retry cadence is owned
//! by the tenant group cache, whose freshness policy makes a later request try
//! again. Pagination of the group listing is intentionally not followed.
//!
//! ## Rust Concepts Used
//!
//! - `#[async_trait]` so the resolver can be used as `Arc<dyn DirectoryResolver>`
//! - `thiserror` for a resolver-specific error enum with `#[from]` conversions
//! - serde `Deserialize` for the OAuth2 and Graph JSON payloads

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::core::config::DirectoryConfig;

/// Scope requested for application permissions on the Graph API
const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Directory operation result
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Directory-specific error types
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory credentials are not configured")]
    MissingCredentials,

    #[error("unable to authenticate against directory for tenant {tenant_id} (status {status}): {message}")]
    Authentication {
        tenant_id: String,
        status: u16,
        message: String,
    },

    #[error("unable to list groups for tenant {tenant_id} (status {status}): {message}")]
    Listing {
        tenant_id: String,
        status: u16,
        message: String,
    },

    #[error("directory call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected directory response: {message}")]
    Decode { message: String },
}

/// One directory group with its display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub id: String,
    pub display_name: String,
}

impl DirectoryGroup {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, display_name: N) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Source of truth for a tenant's group names
#[async_trait]
pub trait DirectoryResolver: Send + Sync {
    /// Fetch the current set of groups for a tenant
    async fn list_groups(&self, tenant_id: &str) -> DirectoryResult<Vec<DirectoryGroup>>;
}

/// Client credentials for the directory
#[derive(Clone)]
pub struct DirectoryCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for DirectoryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GroupPage {
    #[serde(default)]
    value: Vec<GraphGroup>,
}

#[derive(Deserialize)]
struct GraphGroup {
    id: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// Resolver backed by Microsoft Graph
///
/// One resolution is an OAuth2 client-credentials token request against the
/// tenant's authority followed by a single `GET /groups` page.
#[derive(Debug, Clone)]
pub struct GraphDirectoryResolver {
    client: Client,
    credentials: Option<DirectoryCredentials>,
    authority_url: String,
    graph_url: String,
}

impl GraphDirectoryResolver {
    /// Create a resolver with explicit endpoints
    pub fn new(
        credentials: Option<DirectoryCredentials>,
        authority_url: impl Into<String>,
        graph_url: impl Into<String>,
        timeout: Duration,
    ) -> DirectoryResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            credentials,
            authority_url: authority_url.into().trim_end_matches('/').to_string(),
            graph_url: graph_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a resolver from the directory configuration section
    pub fn from_config(config: &DirectoryConfig) -> DirectoryResult<Self> {
        let credentials = match (&config.client_id, &config.client_secret) {
            (Some(client_id), Some(client_secret)) if config.has_credentials() => Some(DirectoryCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => None,
        };

        Self::new(
            credentials,
            config.authority_url.as_str(),
            config.graph_url.as_str(),
            config.request_timeout,
        )
    }

    async fn acquire_token(&self, tenant_id: &str, credentials: &DirectoryCredentials) -> DirectoryResult<String> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url,
            urlencoding::encode(tenant_id)
        );

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("scope", GRAPH_DEFAULT_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Authentication {
                tenant_id: tenant_id.to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| DirectoryError::Decode {
            message: format!("token response: {}", e),
        })?;

        Ok(token.access_token)
    }

    async fn fetch_groups(&self, tenant_id: &str, access_token: &str) -> DirectoryResult<Vec<DirectoryGroup>> {
        let response = self
            .client
            .get(format!("{}/groups", self.graph_url))
            .query(&[("$select", "id,displayName")])
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Listing {
                tenant_id: tenant_id.to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let page: GroupPage = response.json().await.map_err(|e| DirectoryError::Decode {
            message: format!("group listing: {}", e),
        })?;

        Ok(page
            .value
            .into_iter()
            .filter_map(|group| {
                group
                    .display_name
                    .map(|display_name| DirectoryGroup::new(group.id, display_name))
            })
            .collect())
    }
}

#[async_trait]
impl DirectoryResolver for GraphDirectoryResolver {
    async fn list_groups(&self, tenant_id: &str) -> DirectoryResult<Vec<DirectoryGroup>> {
        let credentials = self.credentials.as_ref().ok_or(DirectoryError::MissingCredentials)?;

        let access_token = self.acquire_token(tenant_id, credentials).await?;
        let groups = self.fetch_groups(tenant_id, &access_token).await?;

        debug!(tenant_id, group_count = groups.len(), "Listed directory groups");
        Ok(groups)
    }
}
