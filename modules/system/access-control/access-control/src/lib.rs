//! Access Control Module
//!
//! Evaluates ownership-aware permission checks: maps the configured action to
//! its `*Any`/`*Own` variants, resolves the two ownership operands (directly
//! from the request or through one storage lookup) and asks the rule engine
//! for the final grant.
//!
//! - [`AccessControl`] - the evaluator
//! - [`SeaOrmRecordLookup`] - sea-orm backed point lookup for model operands
//! - [`enforce`] / [`CheckState`] - axum middleware guarding one route
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

pub use api::rest::error::{Problem, access_error_to_problem, forbidden};
pub use api::rest::middleware::{CheckState, enforce};
pub use config::AccessControlConfig;
pub use domain::resolver::OperandResolver;
pub use domain::service::AccessControl;
pub use infra::storage::sea_orm_lookup::SeaOrmRecordLookup;
