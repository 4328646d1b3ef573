//! Collaborator traits consumed by the evaluator.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::check::{ModelLookup, Source};
use crate::error::LookupError;
use crate::models::{Action, PermissionOutcome, PermissionVariant, Possession};
use crate::principal::Principal;

/// Role/permission rule engine.
///
/// Treated as an opaque decision oracle: rule precedence, wildcards and role
/// hierarchies are the implementation's concern.
///
/// ```ignore
/// let outcome = rules.can("user").check(Action::Update.variants().owned, "video");
/// ```
pub trait RuleEngine: Send + Sync {
    /// Query whether `role` holds `variant` on `resource`.
    fn check(&self, role: &str, variant: PermissionVariant, resource: &str) -> PermissionOutcome;
}

impl dyn RuleEngine + '_ {
    /// Bind a role for subsequent queries.
    #[must_use]
    pub fn can<'a>(&'a self, role: &'a str) -> RoleQuery<'a> {
        RoleQuery { rules: self, role }
    }
}

/// Queries against a [`RuleEngine`] for one role.
#[derive(Clone, Copy)]
pub struct RoleQuery<'a> {
    rules: &'a dyn RuleEngine,
    role: &'a str,
}

impl RoleQuery<'_> {
    #[must_use]
    pub fn role(&self) -> &str {
        self.role
    }

    #[must_use]
    pub fn check(&self, variant: PermissionVariant, resource: &str) -> PermissionOutcome {
        self.rules.check(self.role, variant, resource)
    }

    #[must_use]
    pub fn any(&self, action: Action, resource: &str) -> PermissionOutcome {
        self.check(PermissionVariant::new(action, Possession::Any), resource)
    }

    #[must_use]
    pub fn own(&self, action: Action, resource: &str) -> PermissionOutcome {
        self.check(PermissionVariant::new(action, Possession::Own), resource)
    }
}

impl std::fmt::Debug for RoleQuery<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleQuery")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// One row returned by a point lookup, keyed by column name.
pub type Record = Map<String, Value>;

/// `SELECT key_column, value_column FROM table WHERE key_column = key_value LIMIT 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointQuery {
    pub table: String,
    pub key_column: String,
    pub value_column: String,
    /// `None` binds SQL `NULL`, which matches no row.
    pub key_value: Option<Value>,
}

impl PointQuery {
    #[must_use]
    pub fn new(lookup: &ModelLookup, key_value: Option<Value>) -> Self {
        Self {
            table: lookup.model_name().to_owned(),
            key_column: lookup.model_key().to_owned(),
            value_column: lookup.op_key().to_owned(),
            key_value,
        }
    }
}

/// Persistence collaborator used by model-backed operands.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// Fetch at most one row matching the query.
    ///
    /// # Errors
    ///
    /// [`LookupError`] when the backing store fails. Zero matching rows is
    /// `Ok(None)`, not an error.
    async fn find_one(&self, query: &PointQuery) -> Result<Option<Record>, LookupError>;
}

/// Typed access to request-scoped data bags.
pub trait RequestFields: Send + Sync {
    /// The authenticated principal, if an upstream step attached one.
    fn principal(&self) -> Option<&Principal>;

    /// Read `key` from the bag named by `source`. Missing keys are `None`.
    fn field(&self, source: Source, key: &str) -> Option<Value>;
}

/// In-memory [`RequestFields`] implementation.
///
/// Built by transport bindings from a concrete request, or directly by
/// callers evaluating outside an HTTP pipeline.
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    principal: Option<Principal>,
    body: Value,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
}

impl RequestData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Header names are stored lower-case.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

impl RequestFields for RequestData {
    fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    fn field(&self, source: Source, key: &str) -> Option<Value> {
        match source {
            Source::Body => self.body.get(key).cloned(),
            Source::Params => self.params.get(key).cloned().map(Value::String),
            Source::Query => self.query.get(key).cloned().map(Value::String),
            Source::Principal => self.principal.as_ref().and_then(|p| p.field(key)),
            Source::Headers => self
                .headers
                .get(&key.to_ascii_lowercase())
                .cloned()
                .map(Value::String),
        }
    }
}
