//! AI implementations for the extraction library.
//!
//! This module provides reference implementations of the
//! [`AiExtractor`](crate::traits::ai::AiExtractor) trait.

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::GeminiExtractor;
