#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static Grants Plugin
//!
//! This plugin provides an in-memory [`RuleEngine`](access_control_sdk::RuleEngine)
//! built from a static list of grants, for development and testing.
//!
//! - A grant gives a role one permission variant on one resource.
//! - `any` grants imply the matching `own` variant.
//! - Roles inherit the grants of the roles they extend (transitively).
//! - Anything not granted is denied.
//!
//! ## Configuration
//!
//! ```yaml
//! grants:
//!   - { role: user, resource: video, action: "read:own" }
//!   - { role: admin, resource: video, action: "read:any" }
//! extends:
//!   admin: [user]
//! ```

pub mod config;
pub mod domain;

pub use config::{GrantConfig, StaticGrantsPluginConfig};
pub use domain::error::DomainError;
pub use domain::service::Service as StaticGrantsService;
