//! Core trait abstractions for the pipeline.
//!
//! These traits define the seams between the pipeline and the outside
//! world: the nonprofit registry, document hosts, the AI extractor, text
//! recovery and progress reporting. Production adapters live in
//! [`registries`](crate::registries), [`ingestors`](crate::ingestors),
//! [`text`](crate::text) and `ai`; mocks live in
//! [`testing`](crate::testing).

pub mod ai;
pub mod document;
pub mod progress;
pub mod registry;
pub mod text;
