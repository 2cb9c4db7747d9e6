//! The project descriptor itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::dependency::Dependency;
use crate::plugin::Plugin;
use crate::profile::Profile;

/// Identity key of a descriptor: `groupId:artifactId:version`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelId {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ModelId {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Reference from a descriptor to the descriptor it inherits from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Location of the parent relative to this descriptor's directory.
    /// `None` means the default (`..`); an empty string disables path lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
}

impl Parent {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: Some(artifact_id.into()),
            version: Some(version.into()),
            relative_path: None,
        }
    }

    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }

    /// The declared coordinates, if all three are present and non-empty.
    pub fn id(&self) -> Option<ModelId> {
        let group_id = self.group_id.as_deref().filter(|s| !s.is_empty())?;
        let artifact_id = self.artifact_id.as_deref().filter(|s| !s.is_empty())?;
        let version = self.version.as_deref().filter(|s| !s.is_empty())?;
        Some(ModelId::new(group_id, artifact_id, version))
    }
}

/// A URL-like field that children inherit with their module path appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PathFieldRepr", into = "PathFieldRepr")]
pub struct PathField {
    pub value: Option<String>,
    /// When false, this descriptor never inherits the field from its parent.
    pub inherit: bool,
    /// When false, the value is inherited verbatim, without appending the
    /// child's module path.
    pub append_path: bool,
}

impl PathField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn is_default(&self) -> bool {
        self.value.is_none() && self.inherit && self.append_path
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl Default for PathField {
    fn default() -> Self {
        Self {
            value: None,
            inherit: true,
            append_path: true,
        }
    }
}

/// Serialized form of [`PathField`]: a bare string, or an object when the
/// inheritance flags deviate from their defaults.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PathFieldRepr {
    Plain(String),
    Detailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default = "default_true")]
        inherit: bool,
        #[serde(default = "default_true", rename = "appendPath")]
        append_path: bool,
    },
}

fn default_true() -> bool {
    true
}

impl From<PathFieldRepr> for PathField {
    fn from(repr: PathFieldRepr) -> Self {
        match repr {
            PathFieldRepr::Plain(value) => PathField::new(value),
            PathFieldRepr::Detailed {
                value,
                inherit,
                append_path,
            } => PathField {
                value,
                inherit,
                append_path,
            },
        }
    }
}

impl From<PathField> for PathFieldRepr {
    fn from(field: PathField) -> Self {
        match field {
            PathField {
                value: Some(value),
                inherit: true,
                append_path: true,
            } => PathFieldRepr::Plain(value),
            PathField {
                value,
                inherit,
                append_path,
            } => PathFieldRepr::Detailed {
                value,
                inherit,
                append_path,
            },
        }
    }
}

/// Source control coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scm {
    #[serde(skip_serializing_if = "PathField::is_default")]
    pub url: PathField,
    #[serde(skip_serializing_if = "PathField::is_default")]
    pub connection: PathField,
    #[serde(skip_serializing_if = "PathField::is_default")]
    pub developer_connection: PathField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Scm {
    pub fn is_empty(&self) -> bool {
        self == &Scm::default()
    }
}

/// Where the project's site is published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DistributionManagement {
    #[serde(skip_serializing_if = "PathField::is_default")]
    pub url: PathField,
}

impl DistributionManagement {
    pub fn is_empty(&self) -> bool {
        self.url.is_default()
    }
}

/// Scalar build settings; plugins are kept at the model level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_directory: Option<String>,
}

impl BuildSettings {
    pub fn is_empty(&self) -> bool {
        self == &BuildSettings::default()
    }
}

/// A project descriptor, raw or effective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Model {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "PathField::is_default")]
    pub url: PathField,
    #[serde(skip_serializing_if = "Scm::is_empty")]
    pub scm: Scm,
    #[serde(skip_serializing_if = "DistributionManagement::is_empty")]
    pub distribution_management: DistributionManagement,
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
    pub profiles: Vec<Profile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
}

impl Model {
    /// Create a model with the given coordinates.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: Some(artifact_id.into()),
            version: Some(version.into()),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: Parent) -> Self {
        self.parent = Some(parent);
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

    pub fn with_managed_dependency(mut self, dependency: Dependency) -> Self {
        self.dependency_management.push(dependency);
        self
    }

    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// groupId, falling back to the parent's declared groupId.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    /// version, falling back to the parent's declared version.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    /// Identity key as far as it can be derived from this descriptor alone.
    pub fn id(&self) -> Option<ModelId> {
        Some(ModelId::new(
            self.effective_group_id()?,
            self.artifact_id.as_deref()?,
            self.effective_version()?,
        ))
    }

    /// Identity for messages: never fails, fills gaps with `[unknown]`.
    pub fn display_id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.effective_group_id().unwrap_or("[unknown-group-id]"),
            self.artifact_id.as_deref().unwrap_or("[unknown-artifact-id]"),
            self.effective_version().unwrap_or("[unknown-version]"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_inherits_parent_coordinates() {
        let model: Model = serde_json::from_value(json!({
            "parent": {"groupId": "org.acme", "artifactId": "parent", "version": "1.0"},
            "artifactId": "child"
        }))
        .unwrap();

        assert_eq!(model.id(), Some(ModelId::new("org.acme", "child", "1.0")));
        assert_eq!(model.display_id(), "org.acme:child:1.0");
    }

    #[test]
    fn test_path_field_accepts_plain_and_detailed_forms() {
        let model: Model = serde_json::from_value(json!({
            "url": "http://host/site",
            "scm": {"url": {"value": "http://host/scm", "appendPath": false}}
        }))
        .unwrap();

        assert_eq!(model.url.as_deref(), Some("http://host/site"));
        assert!(model.url.append_path);
        assert_eq!(model.scm.url.as_deref(), Some("http://host/scm"));
        assert!(!model.scm.url.append_path);
        assert!(model.scm.url.inherit);
    }

    #[test]
    fn test_path_field_serializes_plain_when_flags_default() {
        let model = Model {
            url: PathField::new("http://host"),
            ..Model::default()
        };
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["url"], "http://host");
    }

    #[test]
    fn test_parent_id_requires_all_coordinates() {
        let mut parent = Parent::new("g", "a", "1");
        assert!(parent.id().is_some());
        parent.version = Some(String::new());
        assert!(parent.id().is_none());
    }
}
