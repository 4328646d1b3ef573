//! Check point configuration: [`CheckSpec`] and its operands.
//!
//! A `CheckSpec` is built once when a route is registered and shared
//! read-only by every request hitting that route.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Action;

/// Request-scoped data bag an operand is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Parsed JSON request body.
    Body,
    /// Path parameters.
    Params,
    /// Query string parameters.
    Query,
    /// The authenticated principal.
    #[serde(alias = "user")]
    Principal,
    /// Request headers (lower-case names).
    Headers,
}

impl Source {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Params => "params",
            Self::Query => "query",
            Self::Principal => "principal",
            Self::Headers => "headers",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration errors detected when building or validating a [`CheckSpec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("invalid action '{0}'")]
    UnknownAction(String),

    #[error("ownership check requires exactly two operands, got {0}")]
    OperandCount(usize),

    #[error("model lookup field '{0}' must not be empty")]
    EmptyModelField(&'static str),

    #[error("model lookup requires modelName, modelKey and opKey together")]
    PartialModelLookup,

    #[error("useModel is set but the second operand has no model lookup")]
    ModelLookupMissing,

    #[error("the first operand is always read from the request and cannot use a model lookup")]
    FirstOperandModel,
}

/// Point lookup target for a model-backed operand.
///
/// Resolves to: `SELECT model_key, op_key FROM model_name WHERE model_key = ? LIMIT 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelLookup {
    model_name: String,
    model_key: String,
    op_key: String,
}

impl ModelLookup {
    /// # Errors
    ///
    /// [`SpecError::EmptyModelField`] if any of the names is empty.
    pub fn new(
        model_name: impl Into<String>,
        model_key: impl Into<String>,
        op_key: impl Into<String>,
    ) -> Result<Self, SpecError> {
        let lookup = Self {
            model_name: model_name.into(),
            model_key: model_key.into(),
            op_key: op_key.into(),
        };

        if lookup.model_name.trim().is_empty() {
            return Err(SpecError::EmptyModelField("modelName"));
        }
        if lookup.model_key.trim().is_empty() {
            return Err(SpecError::EmptyModelField("modelKey"));
        }
        if lookup.op_key.trim().is_empty() {
            return Err(SpecError::EmptyModelField("opKey"));
        }

        Ok(lookup)
    }

    /// Table or collection queried.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Column used as the lookup predicate.
    #[must_use]
    pub fn model_key(&self) -> &str {
        &self.model_key
    }

    /// Column whose value becomes the operand.
    #[must_use]
    pub fn op_key(&self) -> &str {
        &self.op_key
    }
}

/// How an operand obtains its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandSource {
    /// Read `source`/`key` directly from the request.
    Direct,
    /// Read `source`/`key` as a lookup value, then fetch the operand from storage.
    Model(ModelLookup),
}

/// Where to read one comparison value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OperandSpecRepr", into = "OperandSpecRepr")]
pub struct OperandSpec {
    source: Source,
    key: String,
    via: OperandSource,
}

impl OperandSpec {
    /// Operand read directly from a request bag.
    #[must_use]
    pub fn direct(source: Source, key: impl Into<String>) -> Self {
        Self {
            source,
            key: key.into(),
            via: OperandSource::Direct,
        }
    }

    /// Operand fetched from storage, keyed by a value read from a request bag.
    #[must_use]
    pub fn model(source: Source, key: impl Into<String>, lookup: ModelLookup) -> Self {
        Self {
            source,
            key: key.into(),
            via: OperandSource::Model(lookup),
        }
    }

    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn via(&self) -> &OperandSource {
        &self.via
    }

    /// The model lookup, if this operand is storage-backed.
    #[must_use]
    pub fn model_lookup(&self) -> Option<&ModelLookup> {
        match &self.via {
            OperandSource::Direct => None,
            OperandSource::Model(lookup) => Some(lookup),
        }
    }

    fn into_direct(self) -> Self {
        Self {
            via: OperandSource::Direct,
            ..self
        }
    }
}

/// Flat wire form: `{ source, key, modelName?, modelKey?, opKey? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct OperandSpecRepr {
    source: Source,
    key: String,
    #[serde(default, alias = "model_name", skip_serializing_if = "Option::is_none")]
    model_name: Option<String>,
    #[serde(default, alias = "model_key", skip_serializing_if = "Option::is_none")]
    model_key: Option<String>,
    #[serde(default, alias = "op_key", skip_serializing_if = "Option::is_none")]
    op_key: Option<String>,
}

impl TryFrom<OperandSpecRepr> for OperandSpec {
    type Error = SpecError;

    fn try_from(repr: OperandSpecRepr) -> Result<Self, Self::Error> {
        match (repr.model_name, repr.model_key, repr.op_key) {
            (None, None, None) => Ok(Self::direct(repr.source, repr.key)),
            (Some(name), Some(model_key), Some(op_key)) => Ok(Self::model(
                repr.source,
                repr.key,
                ModelLookup::new(name, model_key, op_key)?,
            )),
            _ => Err(SpecError::PartialModelLookup),
        }
    }
}

impl From<OperandSpec> for OperandSpecRepr {
    fn from(spec: OperandSpec) -> Self {
        let (model_name, model_key, op_key) = match spec.via {
            OperandSource::Direct => (None, None, None),
            OperandSource::Model(lookup) => (
                Some(lookup.model_name),
                Some(lookup.model_key),
                Some(lookup.op_key),
            ),
        };
        Self {
            source: spec.source,
            key: spec.key,
            model_name,
            model_key,
            op_key,
        }
    }
}

/// Static configuration of one authorization point.
///
/// # Example
///
/// ```
/// use access_control_sdk::{CheckSpec, ModelLookup, OperandSpec, Source};
///
/// let spec = CheckSpec::new("video", "update").owned_by(
///     OperandSpec::direct(Source::Principal, "id"),
///     OperandSpec::model(
///         Source::Params,
///         "videoId",
///         ModelLookup::new("video", "id", "author_id").unwrap(),
///     ),
/// );
/// assert!(spec.uses_model());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CheckSpecRepr", into = "CheckSpecRepr")]
pub struct CheckSpec {
    /// Resource identifier passed to the rule engine.
    pub resource: String,
    /// Configured action name; validated on every evaluation.
    pub action: String,
    /// Require the principal to own the instance for the owned variant.
    pub check_ownership: bool,
    /// Exactly two entries when `check_ownership` is set.
    pub operands: Vec<OperandSpec>,
}

impl CheckSpec {
    /// Check point without ownership verification.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            check_ownership: false,
            operands: Vec::new(),
        }
    }

    /// Enable the ownership check with the two operands to compare.
    #[must_use]
    pub fn owned_by(self, first: OperandSpec, second: OperandSpec) -> Self {
        self.with_operands(vec![first, second])
    }

    /// Enable the ownership check with an arbitrary operand list.
    ///
    /// The evaluator rejects lists that do not hold exactly two operands.
    #[must_use]
    pub fn with_operands(mut self, operands: Vec<OperandSpec>) -> Self {
        self.check_ownership = true;
        self.operands = operands;
        self
    }

    /// Whether the second operand is resolved through a model lookup.
    #[must_use]
    pub fn uses_model(&self) -> bool {
        self.operands
            .get(1)
            .is_some_and(|op| op.model_lookup().is_some())
    }

    /// Registration-time validation.
    ///
    /// Evaluation re-checks action and operand count on every request; this
    /// lets misconfigured routes fail at startup instead.
    ///
    /// # Errors
    ///
    /// - [`SpecError::UnknownAction`] for an unrecognized action
    /// - [`SpecError::OperandCount`] for an ownership check without two operands
    /// - [`SpecError::FirstOperandModel`] if the first operand carries a model lookup
    pub fn validate(&self) -> Result<Action, SpecError> {
        let action = self
            .action
            .parse::<Action>()
            .map_err(|_| SpecError::UnknownAction(self.action.clone()))?;

        if self.check_ownership {
            if self.operands.len() != 2 {
                return Err(SpecError::OperandCount(self.operands.len()));
            }
            if self.operands[0].model_lookup().is_some() {
                return Err(SpecError::FirstOperandModel);
            }
        }

        Ok(action)
    }
}

/// Wire form; `useModel` is the only switch that enables model lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CheckSpecRepr {
    resource: String,
    action: String,
    #[serde(default, alias = "check_ownership", alias = "checkOwnerShip")]
    check_ownership: bool,
    #[serde(default, alias = "use_model", skip_serializing_if = "Option::is_none")]
    use_model: Option<bool>,
    #[serde(default)]
    operands: Vec<OperandSpec>,
}

impl From<CheckSpec> for CheckSpecRepr {
    fn from(spec: CheckSpec) -> Self {
        let use_model = spec.uses_model().then_some(true);
        Self {
            resource: spec.resource,
            action: spec.action,
            check_ownership: spec.check_ownership,
            use_model,
            operands: spec.operands,
        }
    }
}

impl TryFrom<CheckSpecRepr> for CheckSpec {
    type Error = SpecError;

    fn try_from(repr: CheckSpecRepr) -> Result<Self, Self::Error> {
        let mut operands = repr.operands;

        match repr.use_model {
            Some(true) if operands.len() == 2 && operands[1].model_lookup().is_none() => {
                return Err(SpecError::ModelLookupMissing);
            }
            Some(true) => {}
            None | Some(false) => {
                // Model fields are inert unless useModel is set.
                operands = operands.into_iter().map(OperandSpec::into_direct).collect();
            }
        }

        Ok(Self {
            resource: repr.resource,
            action: repr.action,
            check_ownership: repr.check_ownership,
            operands,
        })
    }
}
