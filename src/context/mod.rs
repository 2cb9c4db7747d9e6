//! Environment facts profile activation and interpolation read from
//!
//! An `ActivationContext` is assembled once per build (by the CLI or an
//! embedding tool) and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Operating system facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub name: String,
    pub family: String,
    pub arch: String,
    pub version: String,
}

impl OsInfo {
    pub fn new(
        name: impl Into<String>,
        arch: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let family = family_of(&name).to_string();
        Self {
            name,
            family,
            arch: arch.into(),
            version: version.into(),
        }
    }

    /// Facts for the running host. The OS version is not probed.
    pub fn current() -> Self {
        let name = match std::env::consts::OS {
            "linux" => "Linux",
            "macos" => "Mac OS X",
            "windows" => "Windows",
            "freebsd" => "FreeBSD",
            other => other,
        };
        Self::new(name, std::env::consts::ARCH, "")
    }

    /// Case-insensitive family test, understanding the umbrella families
    /// `windows`, `dos`, `mac` and `unix`.
    pub fn is_family(&self, family: &str) -> bool {
        let name = self.name.to_ascii_lowercase();
        let windows = name.contains("windows");
        match family.to_ascii_lowercase().as_str() {
            "windows" | "dos" => windows,
            "mac" => name.contains("mac"),
            "unix" => !windows && !name.contains("openvms"),
            other => self.family.eq_ignore_ascii_case(other),
        }
    }
}

impl Default for OsInfo {
    fn default() -> Self {
        Self::current()
    }
}

fn family_of(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.contains("windows") {
        "windows"
    } else if lower.contains("mac") || lower.contains("darwin") {
        "mac"
    } else {
        "unix"
    }
}

/// Environment against which profile activation is evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivationContext {
    pub system_properties: BTreeMap<String, String>,
    pub user_properties: BTreeMap<String, String>,
    /// Process environment, keyed without the `env.` prefix
    pub environment: BTreeMap<String, String>,
    pub project_base_dir: Option<PathBuf>,
    pub os: OsInfo,
    pub jdk_version: String,
    pub explicitly_activated: BTreeSet<String>,
    pub explicitly_deactivated: BTreeSet<String>,
}

impl ActivationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context seeded from the running process: environment variables and
    /// the host OS. The JDK version comes from `JAVA_VERSION` if set.
    pub fn from_process() -> Self {
        let environment: BTreeMap<String, String> = std::env::vars().collect();
        let jdk_version = environment.get("JAVA_VERSION").cloned().unwrap_or_default();
        let os = OsInfo::current();
        let mut system_properties = BTreeMap::new();
        system_properties.insert("os.name".to_string(), os.name.clone());
        system_properties.insert("os.arch".to_string(), os.arch.clone());
        if !jdk_version.is_empty() {
            system_properties.insert("java.version".to_string(), jdk_version.clone());
        }
        Self {
            system_properties,
            environment,
            os,
            jdk_version,
            ..Self::default()
        }
    }

    pub fn with_system_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_user_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_base_dir = Some(dir.into());
        self
    }

    pub fn with_os(mut self, os: OsInfo) -> Self {
        self.os = os;
        self
    }

    pub fn with_jdk(mut self, version: impl Into<String>) -> Self {
        self.jdk_version = version.into();
        self
    }

    pub fn activate(mut self, id: impl Into<String>) -> Self {
        self.explicitly_activated.insert(id.into());
        self
    }

    pub fn deactivate(mut self, id: impl Into<String>) -> Self {
        self.explicitly_deactivated.insert(id.into());
        self
    }

    /// Apply a `-P` style selector: `a,!b,-c` activates `a` and deactivates
    /// `b` and `c`. Blank entries are ignored.
    pub fn with_profile_selector(mut self, selector: &str) -> Self {
        for entry in selector.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(id) = entry.strip_prefix('!').or_else(|| entry.strip_prefix('-')) {
                self.explicitly_deactivated.insert(id.to_string());
            } else {
                let id = entry.strip_prefix('+').unwrap_or(entry);
                self.explicitly_activated.insert(id.to_string());
            }
        }
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.project_base_dir.as_deref()
    }

    /// Property lookup used by activation: user properties over system
    /// properties; `env.NAME` falls through to the environment.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.user_properties
            .get(name)
            .or_else(|| self.system_properties.get(name))
            .or_else(|| {
                name.strip_prefix("env.")
                    .and_then(|key| self.environment.get(key))
            })
            .map(String::as_str)
    }

    pub fn is_deactivated(&self, id: &str) -> bool {
        self.explicitly_deactivated.contains(id)
    }

    pub fn is_activated(&self, id: &str) -> bool {
        self.explicitly_activated.contains(id)
    }
}
