//! Rule engine implementation for the static grants plugin.

use access_control_sdk::{PermissionOutcome, PermissionVariant, RuleEngine};

use super::service::Service;

impl RuleEngine for Service {
    fn check(&self, role: &str, variant: PermissionVariant, resource: &str) -> PermissionOutcome {
        self.evaluate(role, variant, resource)
    }
}
