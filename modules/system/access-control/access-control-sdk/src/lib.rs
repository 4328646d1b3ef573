#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Access Control SDK
//!
//! This crate provides the public contracts of the `access_control` module:
//!
//! - [`CheckSpec`], [`OperandSpec`], [`ModelLookup`] - Check point configuration
//! - [`Action`], [`PermissionVariant`], [`Decision`] - Decision models
//! - [`RuleEngine`] - Role/permission oracle consulted for the final grant
//! - [`RecordLookup`] - Point lookup used by model-backed operands
//! - [`RequestFields`], [`RequestData`] - Typed access to request-scoped bags
//! - [`Principal`] - Authenticated actor attached upstream
//! - [`AccessControlError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use access_control_sdk::{CheckSpec, ModelLookup, OperandSpec, Source};
//!
//! // Built once at route registration.
//! let spec = CheckSpec::new("video", "update").owned_by(
//!     OperandSpec::direct(Source::Principal, "id"),
//!     OperandSpec::model(Source::Params, "videoId", ModelLookup::new("video", "id", "author_id")?),
//! );
//!
//! // Per request.
//! match access.evaluate(&spec, &request).await {
//!     Ok(decision) if decision.is_granted() => { /* continue */ }
//!     Ok(_) => { /* 403 */ }
//!     Err(e) => { /* e.kind() */ }
//! }
//! ```

pub mod api;
pub mod check;
pub mod error;
pub mod models;
pub mod operand;
pub mod principal;

// Re-export main types at crate root
pub use api::{PointQuery, Record, RecordLookup, RequestData, RequestFields, RoleQuery, RuleEngine};
pub use check::{CheckSpec, ModelLookup, OperandSource, OperandSpec, Source, SpecError};
pub use error::{AccessControlError, BoxError, ErrorKind, LookupError, OperandError};
pub use models::{
    Action, Decision, ParseVariantError, PermissionOutcome, PermissionVariant, Possession,
    VariantPair,
};
pub use operand::{canonical_text, operands_match};
pub use principal::{Principal, PrincipalBuilder};
