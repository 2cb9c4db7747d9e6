//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Repository root used when nothing configures one; `~` is the home
/// directory.
pub const DEFAULT_REPOSITORY: &str = "~/.m2/repository";

/// Built-in configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Validation level (default: "strict")
    pub validation: String,

    /// File name of a descriptor inside a project directory (default: "pom.json")
    pub descriptor_name: String,

    /// Local repository root (default: "~/.m2/repository")
    pub repository_local: String,

    /// Expose the process environment as `env.*` (default: true)
    pub env_properties: bool,

    /// Classifiers for classifier management (default: none, finalizer off)
    pub managed_classifiers: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            validation: "strict".to_string(),
            descriptor_name: crate::source::DEFAULT_DESCRIPTOR_NAME.to_string(),
            repository_local: DEFAULT_REPOSITORY.to_string(),
            env_properties: true,
            managed_classifiers: Vec::new(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "validation": self.validation,
            "descriptor_name": self.descriptor_name,
            "repository": {
                "local": self.repository_local
            },
            "profiles": {
                "active": [],
                "inactive": []
            },
            "properties": {},
            "env_properties": self.env_properties,
            "managed_classifiers": self.managed_classifiers
        })
    }
}
