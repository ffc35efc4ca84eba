//! Filing document download trait.

use async_trait::async_trait;

use crate::error::FetchResult;

/// Downloads filing documents.
///
/// Implementations return the raw bytes only when they look like a PDF;
/// anything else is an error.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<Vec<u8>>;
}
