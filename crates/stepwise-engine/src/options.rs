//! Lowering options

use serde::{Deserialize, Serialize};

/// Options controlling the lowering pipeline
///
/// Hosts usually embed these in their own configuration files; every field
/// has a default so partial documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerOptions {
    /// Prefix of temporaries introduced by normalization
    pub temp_prefix: String,
    /// Prefix of bindings promoted to automaton storage
    pub promoted_prefix: String,
    /// Run the automaton invariant checks after building
    pub verify: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            temp_prefix: "tmp$".to_string(),
            promoted_prefix: "await$".to_string(),
            verify: true,
        }
    }
}
