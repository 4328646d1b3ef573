use serde::{Deserialize, Serialize};

fn default_body_limit_bytes() -> usize {
    16 * 1024 * 1024
}

/// HTTP enforcement configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessControlConfig {
    /// Maximum JSON body buffered when an operand reads from the `body` bag.
    pub body_limit_bytes: usize,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}
