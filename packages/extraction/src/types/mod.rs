//! Data types shared by the discovery and extraction pipeline.

pub mod config;
pub mod organization;
pub mod progress;
pub mod result;
