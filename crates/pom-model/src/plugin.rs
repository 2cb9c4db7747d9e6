//! Build plugins and their executions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config_node::ConfigNode;
use crate::dependency::Dependency;

/// groupId assumed for plugins that do not declare one.
pub const DEFAULT_PLUGIN_GROUP_ID: &str = "org.apache.maven.plugins";

/// Execution id assumed when an execution does not declare one.
pub const DEFAULT_EXECUTION_ID: &str = "default";

/// Key matching a plugin with its managed defaults: `(groupId, artifactId)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginKey {
    pub group_id: String,
    pub artifact_id: String,
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

fn default_plugin_group_id() -> String {
    DEFAULT_PLUGIN_GROUP_ID.to_string()
}

fn default_execution_id() -> String {
    DEFAULT_EXECUTION_ID.to_string()
}

/// A plugin declaration (or managed plugin defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    #[serde(default = "default_plugin_group_id")]
    pub group_id: String,
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<bool>,
    /// `Some(false)` keeps the plugin out of child descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executions: Vec<Execution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ConfigNode>,
}

impl Default for Plugin {
    fn default() -> Self {
        Self {
            group_id: default_plugin_group_id(),
            artifact_id: String::new(),
            version: None,
            extensions: None,
            inherited: None,
            executions: Vec::new(),
            dependencies: Vec::new(),
            configuration: None,
        }
    }
}

impl Plugin {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.executions.push(execution);
        self
    }

    pub fn with_configuration(mut self, configuration: ConfigNode) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_inherited(mut self, inherited: bool) -> Self {
        self.inherited = Some(inherited);
        self
    }

    pub fn key(&self) -> PluginKey {
        PluginKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
        }
    }

    /// Whether children receive this plugin through inheritance.
    pub fn is_inherited(&self) -> bool {
        self.inherited.unwrap_or(true)
    }
}

/// One execution of a plugin, bound to a lifecycle phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(default = "default_execution_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ConfigNode>,
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            id: default_execution_id(),
            phase: None,
            goals: Vec::new(),
            inherited: None,
            configuration: None,
        }
    }
}

impl Execution {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    pub fn with_configuration(mut self, configuration: ConfigNode) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited.unwrap_or(true)
    }
}
