//! Layered CLI configuration
//!
//! Four layers, later ones winning:
//! 1. Built-in defaults
//! 2. User config (~/.config/pom-builder/config.toml)
//! 3. Project config (.pom-builder.toml next to the leaf descriptor)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, DEFAULT_REPOSITORY};
pub use effective::{
    user_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, PROJECT_CONFIG_NAME,
};
pub use merge::{deep_merge, merge_layers};
