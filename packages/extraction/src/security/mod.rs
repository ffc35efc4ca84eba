//! Credential handling.

pub mod credentials;

pub use credentials::{AiCredentials, SecretString};
