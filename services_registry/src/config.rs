//! Registry bootstrap configuration

use serde::{Deserialize, Serialize};

/// Configuration for starting a registry instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Name the registry binds in the runtime's address table
    pub service_name: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            service_name: "registry".to_string(),
        }
    }
}
