use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The authenticated actor attached to a request by an upstream step.
///
/// Exposes the role consulted by the rule engine and arbitrary attributes
/// (`id`, `_id`, ...) that ownership operands can read through
/// [`Source::Principal`](crate::Source::Principal).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    role: String,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl Principal {
    /// Create a new `Principal` builder
    #[must_use]
    pub fn builder() -> PrincipalBuilder {
        PrincipalBuilder::default()
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Read a field by name. `role` resolves to the role itself.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<Value> {
        if key == "role" {
            return Some(Value::String(self.role.clone()));
        }
        self.attributes.get(key).cloned()
    }
}

#[derive(Debug, Default)]
pub struct PrincipalBuilder {
    role: Option<String>,
    attributes: Map<String, Value>,
}

impl PrincipalBuilder {
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Shorthand for the `id` attribute.
    #[must_use]
    pub fn id(self, id: impl Into<Value>) -> Self {
        self.attribute("id", id)
    }

    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Principal {
        Principal {
            role: self.role.unwrap_or_default(),
            attributes: self.attributes,
        }
    }
}
