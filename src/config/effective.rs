//! Effective configuration with provenance
//!
//! The merged configuration plus where each layer came from. Secret-looking
//! keys are redacted in the reported view; typed accessors read the
//! unredacted values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::context::ActivationContext;
use crate::problem::ValidationLevel;
use crate::source::DEFAULT_DESCRIPTOR_NAME;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "pom-builder/effective_config@1";

/// Project config file name, looked up next to the leaf descriptor
pub const PROJECT_CONFIG_NAME: &str = ".pom-builder.toml";

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Project,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// Merged configuration, secrets redacted
    pub config: Value,

    /// Contributing layers, lowest precedence first
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,

    #[serde(skip)]
    resolved: Value,
}

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "passphrase", "credential"];

/// `~/.config/pom-builder/config.toml`, when a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("pom-builder")
            .join("config.toml")
    })
}

impl EffectiveConfig {
    /// Merge builtin defaults, the user file, the project file and CLI
    /// overrides. Missing files are skipped.
    pub fn build(
        user_config_path: Option<&Path>,
        project_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        for (origin, path) in [
            (ConfigOrigin::User, user_config_path),
            (ConfigOrigin::Project, project_config_path),
        ] {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            let (value, digest) = load_toml_file(path)?;
            tracing::debug!(path = %path.display(), origin = ?origin, "loaded config layer");
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().into_owned()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let resolved = merge_layers(layers);
        validate_config(&resolved)?;

        let mut config = resolved.clone();
        let mut redactions = Vec::new();
        redact(&mut config, String::new(), &mut redactions);

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config,
            sources,
            redactions,
            resolved,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.resolved, |current, part| current.get(part))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn validation_level(&self) -> ValidationLevel {
        self.get_str("validation")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn descriptor_name(&self) -> &str {
        self.get_str("descriptor_name").unwrap_or(DEFAULT_DESCRIPTOR_NAME)
    }

    /// Local repository root with a leading `~` expanded.
    pub fn repository_root(&self) -> PathBuf {
        let raw = self
            .get_str("repository.local")
            .unwrap_or(super::defaults::DEFAULT_REPOSITORY);
        match (raw.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
            _ => PathBuf::from(raw),
        }
    }

    pub fn active_profiles(&self) -> Vec<String> {
        self.strings("profiles.active")
    }

    pub fn inactive_profiles(&self) -> Vec<String> {
        self.strings("profiles.inactive")
    }

    pub fn managed_classifiers(&self) -> Vec<String> {
        self.strings("managed_classifiers")
    }

    pub fn env_properties(&self) -> bool {
        self.get_bool("env_properties").unwrap_or(true)
    }

    /// User properties; non-string scalars are rendered as text.
    pub fn properties(&self) -> BTreeMap<String, String> {
        let Some(Value::Object(map)) = self.get("properties") else {
            return BTreeMap::new();
        };
        map.iter()
            .filter_map(|(k, v)| scalar_text(v).map(|text| (k.clone(), text)))
            .collect()
    }

    /// Layer this configuration onto an activation context: user
    /// properties, profile selections and environment exposure.
    pub fn apply(&self, mut context: ActivationContext) -> ActivationContext {
        context.user_properties.extend(self.properties());
        context.explicitly_activated.extend(self.active_profiles());
        context.explicitly_deactivated.extend(self.inactive_profiles());
        if !self.env_properties() {
            context.environment.clear();
        }
        context
    }

    fn strings(&self, path: &str) -> Vec<String> {
        self.get(path)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("{}: invalid UTF-8: {}", path.display(), e)))?;
    let value: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

    Ok((toml_to_json(value), digest))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect()),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn redact(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let current = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                let key_lower = key.to_lowercase();
                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));
                if is_secret && !val.is_object() && !val.is_array() {
                    *val = Value::String("[REDACTED]".to_string());
                    redactions.push(current);
                } else {
                    redact(val, current, redactions);
                }
            }
        }
        Value::Array(items) => {
            for (i, val) in items.iter_mut().enumerate() {
                redact(val, format!("{}[{}]", path, i), redactions);
            }
        }
        _ => {}
    }
}

fn validate_config(config: &Value) -> Result<(), ConfigError> {
    if let Some(level) = config.get("validation") {
        let level = level
            .as_str()
            .ok_or_else(|| ConfigError::ValidationError("validation must be a string".to_string()))?;
        level
            .parse::<ValidationLevel>()
            .map_err(ConfigError::ValidationError)?;
    }

    match config.get("descriptor_name") {
        Some(Value::String(name)) if !name.trim().is_empty() => {}
        None => {}
        Some(_) => {
            return Err(ConfigError::ValidationError(
                "descriptor_name must be a non-empty string".to_string(),
            ))
        }
    }

    for path in ["profiles.active", "profiles.inactive", "managed_classifiers"] {
        let value = path.split('.').try_fold(config, |current, part| current.get(part));
        match value {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) if items.iter().all(Value::is_string) => {}
            Some(_) => {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be an array of strings",
                    path
                )))
            }
        }
    }

    if let Some(Value::Object(properties)) = config.get("properties") {
        if let Some((key, _)) = properties.iter().find(|(_, v)| scalar_text(v).is_none()) {
            return Err(ConfigError::ValidationError(format!(
                "properties.{} must be a string, number or boolean",
                key
            )));
        }
    }

    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::IoError(_) => "IO_ERROR",
            ConfigError::ParseError(_) => "PARSE_ERROR",
            ConfigError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }
}
