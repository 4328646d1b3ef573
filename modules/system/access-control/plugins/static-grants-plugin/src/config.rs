//! Configuration for the static grants plugin.

use std::collections::HashMap;

use access_control_sdk::PermissionVariant;
use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticGrantsPluginConfig {
    /// Granted permission variants.
    pub grants: Vec<GrantConfig>,

    /// Role inheritance: role -> roles whose grants it receives.
    pub extends: HashMap<String, Vec<String>>,
}

/// A single grant: `role` may perform `action` on `resource`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantConfig {
    pub role: String,
    pub resource: String,
    /// Permission variant in `read:own` or `readOwn` notation.
    pub action: PermissionVariant,
}
