//! rds-clone-common - Shared types and utilities
//!
//! Dependency-light pieces shared by the rds-clone library and binary,
//! kept free of AWS SDK and SQL driver dependencies.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`naming`]: Identifier derivation for clones and transient snapshots
//! - [`resource_kind`]: The two RDS resource kinds the tool manages
//! - [`tags`]: Ownership tag schema used for discovery and cleanup

pub mod defaults;
pub mod naming;
pub mod resource_kind;
pub mod tags;

pub use resource_kind::ResourceKind;
