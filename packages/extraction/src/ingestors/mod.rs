//! Document fetcher implementations.
//!
//! - [`HttpDocumentFetcher`] - Plain HTTP download with a browser-like
//!   header retry on 403
//! - `MockFetcher` - For testing (see [`testing`](crate::testing))
//!
//! # Example
//!
//! ```rust,ignore
//! use filing_extraction::ingestors::HttpDocumentFetcher;
//! use filing_extraction::traits::document::DocumentFetcher;
//!
//! let fetcher = HttpDocumentFetcher::new();
//! let pdf = fetcher.fetch("https://projects.propublica.org/nonprofits/download-filing?path=x.pdf").await?;
//! ```

mod http;

pub use http::HttpDocumentFetcher;
