//! Rate-limited registry wrapper.
//!
//! Wraps any Registry implementation with a request quota using the
//! governor crate. This sits on top of the orchestrator's semaphore: the
//! semaphore bounds calls in flight, the quota bounds calls per second.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::RegistryResult;
use crate::traits::registry::{Registry, SearchPage};
use crate::types::organization::{Ein, Organization};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A registry wrapper that enforces a request quota.
pub struct RateLimitedRegistry<R: Registry> {
    inner: R,
    limiter: Arc<DefaultRateLimiter>,
}

impl<R: Registry> RateLimitedRegistry<R> {
    /// Allow `requests_per_second` calls, with a burst of the same size.
    pub fn new(registry: R, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(registry, Quota::per_second(requests_per_second))
    }

    /// Create with a custom quota.
    pub fn with_quota(registry: R, quota: Quota) -> Self {
        Self {
            inner: registry,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: Registry> Registry for RateLimitedRegistry<R> {
    async fn search(&self, term: &str, jurisdiction: &str, page: u32) -> RegistryResult<SearchPage> {
        self.limiter.until_ready().await;
        self.inner.search(term, jurisdiction, page).await
    }

    async fn organization(&self, ein: Ein) -> RegistryResult<Organization> {
        self.limiter.until_ready().await;
        self.inner.organization(ein).await
    }
}

/// Extension trait for easy rate limiting.
pub trait RegistryExt: Registry + Sized {
    /// Wrap this registry with a per-second quota.
    fn rate_limited(self, requests_per_second: NonZeroU32) -> RateLimitedRegistry<Self> {
        RateLimitedRegistry::new(self, requests_per_second)
    }
}

impl<R: Registry + Sized> RegistryExt for R {}
