//! Shared Module
//!
//! Types that are independent of how the outbox is hosted: the incident
//! payload sent to the backend, shared error types and transport
//! configuration.

/// Incident report payload
pub mod incident;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use incident::IncidentPayload;
pub use error::SharedError;
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
