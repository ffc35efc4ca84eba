//! Registry implementations.
//!
//! - `ProPublicaRegistry` - Nonprofit Explorer API (requires `propublica` feature)
//! - [`RateLimitedRegistry`] - governor quota around any registry
//! - `MockRegistry` - For testing (see [`testing`](crate::testing))

mod rate_limited;

#[cfg(feature = "propublica")]
mod propublica;

pub use rate_limited::{RateLimitedRegistry, RegistryExt};

#[cfg(feature = "propublica")]
pub use propublica::ProPublicaRegistry;
