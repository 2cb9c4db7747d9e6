//! Profiles: optional overlays applied when their activation matches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dependency::Dependency;
use crate::model::BuildSettings;
use crate::plugin::Plugin;

/// Condition under which a profile applies.
///
/// String-valued conditions accept a leading `!` to negate the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Activation {
    /// JDK version prefix (`11`) or range (`[1.8,11)`).
    Jdk {
        version: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        negated: bool,
    },
    /// Operating system facts; every declared field must match.
    Os {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        family: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arch: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    /// A system or user property is present (and optionally equal to `value`).
    Property {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// A file exists or is missing.
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exists: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        missing: Option<String>,
    },
    /// Active unless another profile of the same descriptor is active.
    ActiveByDefault,
}

/// An overlay on a descriptor, carrying every non-identity field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependency_management: Vec<Dependency>,
    #[serde(skip_serializing_if = "BuildSettings::is_empty")]
    pub build: BuildSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<Plugin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugin_management: Vec<Plugin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn is_active_by_default(&self) -> bool {
        matches!(self.activation, Some(Activation::ActiveByDefault))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activation_tagged_form() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "ci",
            "activation": {"kind": "property", "name": "env.CI"}
        }))
        .unwrap();

        assert_eq!(
            profile.activation,
            Some(Activation::Property {
                name: "env.CI".to_string(),
                value: None
            })
        );
    }

    #[test]
    fn test_active_by_default_round_trip_shape() {
        let profile = Profile::new("default").with_activation(Activation::ActiveByDefault);
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["activation"], json!({"kind": "activeByDefault"}));
        assert!(profile.is_active_by_default());
    }
}
