//! # Authentication Context
//!
//! Everything between the raw bearer token and the enrichment headers:
//! claim decoding, the directory resolver, the claim projector and the tower
//! middleware that applies it.

pub mod claims;
pub mod directory;
pub mod middleware;
pub mod projector;

pub use claims::{normalize_token, TokenClaims};
pub use directory::{
    DirectoryCredentials, DirectoryError, DirectoryGroup, DirectoryResolver, DirectoryResult,
    GraphDirectoryResolver,
};
pub use middleware::{ClaimEnrichmentLayer, ClaimEnrichmentService};
pub use projector::{ClaimProjector, EnrichmentHeaders, ProjectorSettings};
