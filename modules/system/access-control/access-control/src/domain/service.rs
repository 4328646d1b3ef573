//! Decision engine for ownership-aware permission checks.

use std::sync::Arc;

use access_control_sdk::{
    AccessControlError, Action, CheckSpec, Decision, RecordLookup, RequestFields, RuleEngine,
    operands_match,
};
use tracing::{debug, warn};

use super::resolver::OperandResolver;

/// Ownership-aware permission evaluator.
///
/// Constructed once with the rule engine (and, for model-backed operands, a
/// record lookup); cheap to clone and share across requests.
///
/// Per evaluation:
/// 1. Maps the configured action to its broad/owned variants (fails fast)
/// 2. Reads the principal's role
/// 3. Without an ownership check: queries the broad variant
/// 4. With an ownership check: resolves both operands and queries the owned
///    variant when their textual forms are equal, the broad variant otherwise
#[derive(Clone)]
pub struct AccessControl {
    rules: Arc<dyn RuleEngine>,
    resolver: OperandResolver,
}

impl AccessControl {
    #[must_use]
    pub fn new(rules: Arc<dyn RuleEngine>) -> Self {
        Self {
            rules,
            resolver: OperandResolver::default(),
        }
    }

    /// Attach the persistence collaborator used by model-backed operands.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn RecordLookup>) -> Self {
        self.resolver = OperandResolver::new(Some(lookup));
        self
    }

    /// Evaluate one check point against one request.
    ///
    /// `Ok(Decision::Denied(_))` is a normal outcome; errors abort the request.
    ///
    /// # Errors
    ///
    /// - [`AccessControlError::InvalidAction`] for an unrecognized action, before anything else
    /// - [`AccessControlError::MissingPrincipal`] if no principal is attached
    /// - [`AccessControlError::InvalidOperands`] for an ownership check without two operands
    /// - [`AccessControlError::OperandResolutionFailed`] if operand resolution fails
    #[tracing::instrument(skip_all, fields(resource = %spec.resource, action = %spec.action))]
    pub async fn evaluate<R>(
        &self,
        spec: &CheckSpec,
        request: &R,
    ) -> Result<Decision, AccessControlError>
    where
        R: RequestFields + ?Sized,
    {
        let variants = spec
            .action
            .parse::<Action>()
            .inspect_err(|e| warn!("Rejected check point configuration: {e}"))?
            .variants();

        let role = request
            .principal()
            .ok_or(AccessControlError::MissingPrincipal)?
            .role();

        let variant = if spec.check_ownership {
            let [first, second] = spec.operands.as_slice() else {
                let err = AccessControlError::InvalidOperands {
                    count: spec.operands.len(),
                };
                warn!("Rejected check point configuration: {err}");
                return Err(err);
            };

            let (first_value, second_value) =
                self.resolver.resolve(first, second, request).await?;

            if operands_match(first_value.as_ref(), second_value.as_ref()) {
                variants.owned
            } else {
                variants.broad
            }
        } else {
            variants.broad
        };

        let outcome = self.rules.can(role).check(variant, &spec.resource);

        if outcome.granted {
            debug!(role, %variant, "Access granted");
            Ok(Decision::Granted(variant))
        } else {
            debug!(role, %variant, "Access denied");
            Ok(Decision::Denied(variant))
        }
    }
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
