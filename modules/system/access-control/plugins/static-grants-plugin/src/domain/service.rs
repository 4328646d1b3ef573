//! Service implementation for the static grants plugin.

use std::collections::{HashMap, HashSet, VecDeque};

use access_control_sdk::{PermissionOutcome, PermissionVariant, Possession};
use tracing::info;

use super::error::DomainError;
use crate::config::StaticGrantsPluginConfig;

type ResourceGrants = HashMap<String, HashSet<PermissionVariant>>;

/// Static grants rule engine.
///
/// - `granted` if the role, or any role it extends, holds the variant on the resource
/// - holding `*Any` also grants the matching `*Own`
/// - unknown roles and resources are denied
#[derive(Debug, Default)]
pub struct Service {
    grants: HashMap<String, ResourceGrants>,
    extends: HashMap<String, Vec<String>>,
}

impl Service {
    /// Build the grant table from configuration.
    ///
    /// # Errors
    ///
    /// - [`DomainError::SelfInheritance`] if a role lists itself in `extends`
    /// - [`DomainError::CyclicInheritance`] if role inheritance forms a cycle
    pub fn from_config(config: &StaticGrantsPluginConfig) -> Result<Self, DomainError> {
        let mut grants: HashMap<String, ResourceGrants> = HashMap::new();
        for grant in &config.grants {
            grants
                .entry(grant.role.clone())
                .or_default()
                .entry(grant.resource.clone())
                .or_default()
                .insert(grant.action);
        }

        let service = Self {
            grants,
            extends: config.extends.clone(),
        };
        service.check_inheritance()?;

        info!(
            roles = service.grants.len(),
            grants = config.grants.len(),
            "Static grants loaded"
        );
        Ok(service)
    }

    /// Evaluate one permission query.
    #[must_use]
    pub fn evaluate(&self, role: &str, variant: PermissionVariant, resource: &str) -> PermissionOutcome {
        if self
            .lineage(role)
            .into_iter()
            .any(|r| self.holds(r, variant, resource))
        {
            PermissionOutcome::granted()
        } else {
            PermissionOutcome::denied()
        }
    }

    fn holds(&self, role: &str, variant: PermissionVariant, resource: &str) -> bool {
        let Some(held) = self.grants.get(role).and_then(|r| r.get(resource)) else {
            return false;
        };

        held.contains(&variant)
            || (variant.possession() == Possession::Own && held.contains(&variant.broad()))
    }

    /// The role followed by every role it extends, breadth-first, without repeats.
    fn lineage<'a>(&'a self, role: &'a str) -> Vec<&'a str> {
        let mut seen: HashSet<&str> = HashSet::from([role]);
        let mut order = vec![role];
        let mut queue = VecDeque::from([role]);

        while let Some(current) = queue.pop_front() {
            for parent in self.extends.get(current).into_iter().flatten() {
                if seen.insert(parent.as_str()) {
                    order.push(parent.as_str());
                    queue.push_back(parent.as_str());
                }
            }
        }

        order
    }

    fn check_inheritance(&self) -> Result<(), DomainError> {
        for (role, parents) in &self.extends {
            if parents.iter().any(|p| p == role) {
                return Err(DomainError::SelfInheritance { role: role.clone() });
            }
            let reaches_itself = parents
                .iter()
                .any(|p| self.lineage(p).contains(&role.as_str()));
            if reaches_itself {
                return Err(DomainError::CyclicInheritance { role: role.clone() });
            }
        }
        Ok(())
    }
}
