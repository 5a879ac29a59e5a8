//! # Claim Enrichment Middleware
//!
//! Tower middleware that runs the claim projector on every request and hands
//! the enriched request to the wrapped service. It never rejects a request:
//! enrichment failures only mean fewer headers.
//!
//! ## Rust Concepts Used
//!
//! - `tower::Layer` / `tower::Service` for middleware implementation
//! - `Pin<Box<dyn Future>>` (`BoxFuture`) for the async response future
//! - `Arc<ClaimProjector>` so every service clone shares one cache

use axum::extract::Request;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::auth::projector::ClaimProjector;

/// Tower layer adding claim-derived headers to requests
#[derive(Debug, Clone)]
pub struct ClaimEnrichmentLayer {
    projector: Arc<ClaimProjector>,
}

impl ClaimEnrichmentLayer {
    pub fn new(projector: Arc<ClaimProjector>) -> Self {
        Self { projector }
    }
}

impl<S> Layer<S> for ClaimEnrichmentLayer {
    type Service = ClaimEnrichmentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClaimEnrichmentService {
            inner,
            projector: Arc::clone(&self.projector),
        }
    }
}

/// Tower service produced by [`ClaimEnrichmentLayer`]
#[derive(Debug, Clone)]
pub struct ClaimEnrichmentService<S> {
    inner: S,
    projector: Arc<ClaimProjector>,
}

impl<S> Service<Request> for ClaimEnrichmentService<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let projector = Arc::clone(&self.projector);

        // Keep the service that was polled ready, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();
            projector.enrich(&mut parts.headers).await;
            inner.call(Request::from_parts(parts, body)).await
        })
    }
}
