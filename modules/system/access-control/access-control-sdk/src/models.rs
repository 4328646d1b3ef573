//! Domain models for the access control module.
//!
//! Actions and permission variants follow the grants notation of role-based
//! rule engines: every action has a broad (`Any`) and an instance-owned
//! (`Own`) variant, rendered as `readAny` / `readOwn` or `read:any` / `read:own`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AccessControlError;

/// Semantic action guarded by a check point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    /// All recognized actions.
    pub const ALL: [Self; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// The broad/owned permission variants understood by the rule engine.
    #[must_use]
    pub fn variants(self) -> VariantPair {
        VariantPair {
            broad: PermissionVariant::new(self, Possession::Any),
            owned: PermissionVariant::new(self, Possession::Own),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AccessControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(AccessControlError::InvalidAction {
                action: other.to_owned(),
            }),
        }
    }
}

/// Whether a permission covers any instance or only instances owned by the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Possession {
    Any,
    Own,
}

impl Possession {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Own => "own",
        }
    }
}

/// A permission variant identifier, e.g. `updateOwn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PermissionVariant {
    action: Action,
    possession: Possession,
}

impl PermissionVariant {
    #[must_use]
    pub fn new(action: Action, possession: Possession) -> Self {
        Self { action, possession }
    }

    #[must_use]
    pub fn action(self) -> Action {
        self.action
    }

    #[must_use]
    pub fn possession(self) -> Possession {
        self.possession
    }

    /// The broad counterpart of this variant (`readOwn` -> `readAny`).
    #[must_use]
    pub fn broad(self) -> Self {
        Self::new(self.action, Possession::Any)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match (self.action, self.possession) {
            (Action::Create, Possession::Any) => "createAny",
            (Action::Create, Possession::Own) => "createOwn",
            (Action::Read, Possession::Any) => "readAny",
            (Action::Read, Possession::Own) => "readOwn",
            (Action::Update, Possession::Any) => "updateAny",
            (Action::Update, Possession::Own) => "updateOwn",
            (Action::Delete, Possession::Any) => "deleteAny",
            (Action::Delete, Possession::Own) => "deleteOwn",
        }
    }
}

impl fmt::Display for PermissionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a permission variant string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission variant '{0}'")]
pub struct ParseVariantError(pub String);

impl FromStr for PermissionVariant {
    type Err = ParseVariantError;

    /// Accepts both `readAny` and `read:any` notations.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (action, possession) = match s.split_once(':') {
            Some((action, possession)) => (action, possession),
            None => {
                let split = s.find(['A', 'O']).ok_or_else(|| ParseVariantError(s.to_owned()))?;
                s.split_at(split)
            }
        };

        let action = action
            .parse::<Action>()
            .map_err(|_| ParseVariantError(s.to_owned()))?;
        let possession = match possession {
            "any" | "Any" => Possession::Any,
            "own" | "Own" => Possession::Own,
            _ => return Err(ParseVariantError(s.to_owned())),
        };

        Ok(Self::new(action, possession))
    }
}

impl From<PermissionVariant> for String {
    fn from(v: PermissionVariant) -> Self {
        v.as_str().to_owned()
    }
}

impl TryFrom<String> for PermissionVariant {
    type Error = ParseVariantError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Broad and owned permission variants of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantPair {
    /// Acting on any instance of the resource.
    pub broad: PermissionVariant,
    /// Acting only on instances owned by the principal.
    pub owned: PermissionVariant,
}

/// Result of a single rule-engine query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionOutcome {
    pub granted: bool,
}

impl PermissionOutcome {
    #[must_use]
    pub fn granted() -> Self {
        Self { granted: true }
    }

    #[must_use]
    pub fn denied() -> Self {
        Self { granted: false }
    }
}

/// Final decision for one evaluation, naming the variant that was queried.
///
/// Access denial is a normal outcome, not an error; failures are reported
/// through [`AccessControlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted(PermissionVariant),
    Denied(PermissionVariant),
}

impl Decision {
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted(_))
    }

    #[must_use]
    pub fn variant(self) -> PermissionVariant {
        match self {
            Self::Granted(v) | Self::Denied(v) => v,
        }
    }
}
