//! pom-builder CLI
//!
//! Entry point for the `pom-builder` command-line tool.

use clap::{Args, Parser, Subcommand};
use pom_builder::config::{user_config_path, EffectiveConfig, PROJECT_CONFIG_NAME};
use pom_builder::finalize::{classifier_management, plugin_configuration_expansion};
use pom_builder::signal::EXIT_CODE_ABORTED;
use pom_builder::{
    ActivationContext, BuildSession, ExplainReport, FileModelSource, LocalRepository, ModelBuildingError,
    ModelBuildingRequest, ModelBuildingResult, ValidationLevel,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit code for usage, configuration and I/O errors
const EXIT_CODE_USAGE: i32 = 2;

#[derive(Parser)]
#[command(name = "pom-builder")]
#[command(about = "Effective project model builder", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective model as JSON
    Effective {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Explain a build: chain, active profiles, problems and decision
    Explain {
        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Print the effective CLI configuration with its sources
    Config {
        /// Path to project config file (default: .pom-builder.toml next to the descriptor)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Descriptor or project directory whose project config to include
        descriptor: Option<PathBuf>,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Leaf descriptor, or the project directory holding it
    descriptor: PathBuf,

    /// Profiles to activate, comma-separated; `!id` or `-id` deactivates
    #[arg(short = 'P', long = "activate-profiles")]
    profiles: Vec<String>,

    /// User property as `name=value` (repeatable)
    #[arg(short = 'D', value_parser = parse_property)]
    define: Vec<(String, String)>,

    /// Validation level: minimal, lenient or strict
    #[arg(long)]
    validation: Option<ValidationLevel>,

    /// Local repository root (default: ~/.m2/repository)
    #[arg(long)]
    repository: Option<PathBuf>,

    /// Path to project config file (default: .pom-builder.toml next to the descriptor)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

impl BuildArgs {
    fn cli_overrides(&self) -> serde_json::Value {
        let mut overrides = serde_json::Map::new();
        if let Some(level) = self.validation {
            overrides.insert("validation".into(), level.as_str().into());
        }
        if let Some(repository) = &self.repository {
            overrides.insert(
                "repository".into(),
                serde_json::json!({ "local": repository.to_string_lossy() }),
            );
        }
        if !self.define.is_empty() {
            let properties: BTreeMap<&str, &str> = self
                .define
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            overrides.insert("properties".into(), serde_json::json!(properties));
        }
        serde_json::Value::Object(overrides)
    }
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, _)) if name.trim().is_empty() => Err(format!("empty property name in '{}'", raw)),
        Some((name, value)) => Ok((name.trim().to_string(), value.to_string())),
        // `-Dflag` alone means `flag=true`
        None if !raw.trim().is_empty() => Ok((raw.trim().to_string(), "true".to_string())),
        None => Err("empty property".to_string()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Effective { build } => run_effective(build),
        Commands::Explain { human, build } => run_explain(human, build),
        Commands::Config { config, descriptor } => run_config(config, descriptor),
    }
}

fn run_effective(args: BuildArgs) {
    let outcome = build(&args);

    print_problems(outcome.as_ref().map(|r| r.problems.as_slice()).unwrap_or_else(|e| e.problems()));
    match outcome {
        Ok(result) => match serde_json::to_string_pretty(&result.effective_model) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            process::exit(exit_code(&e));
        }
    }
}

fn run_explain(human: bool, args: BuildArgs) {
    let outcome = build(&args);
    let report = ExplainReport::from_outcome(&args.descriptor.display().to_string(), &outcome);

    if human {
        print!("{}", report.to_human());
    } else {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    }

    if let Err(e) = &outcome {
        process::exit(exit_code(e));
    }
}

fn run_config(config_path: Option<PathBuf>, descriptor: Option<PathBuf>) {
    let project_dir = descriptor.as_deref().map(|d| project_dir(&canonical_or_exit(d)));
    let config = load_config(config_path, project_dir.as_deref(), None);

    match config.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

/// Read the descriptor, assemble the context and run one build in a fresh
/// session. Usage and I/O errors exit here.
fn build(args: &BuildArgs) -> Result<ModelBuildingResult, ModelBuildingError> {
    let descriptor = canonical_or_exit(&args.descriptor);
    let dir = project_dir(&descriptor);
    let config = load_config(args.config.clone(), Some(&dir), Some(args.cli_overrides()));
    let leaf = if descriptor.is_dir() {
        descriptor.join(config.descriptor_name())
    } else {
        descriptor
    };

    let mut session = BuildSession::new(
        Arc::new(FileModelSource::with_descriptor_name(config.descriptor_name())),
        Arc::new(LocalRepository::new(config.repository_root())),
    )
    .with_finalizer(plugin_configuration_expansion());
    let classifiers = config.managed_classifiers();
    if !classifiers.is_empty() {
        session = session.with_finalizer(classifier_management(classifiers));
    }
    if let Err(e) = session.abort_signal().install_handler() {
        tracing::warn!(error = %e, "could not install signal handler");
    }

    let model = match session.read(&leaf) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error reading {}: {}", leaf.display(), e);
            process::exit(EXIT_CODE_USAGE);
        }
    };

    let mut context = config
        .apply(ActivationContext::from_process())
        .with_base_dir(&dir);
    for selector in &args.profiles {
        context = context.with_profile_selector(selector);
    }

    let request = ModelBuildingRequest::new(model)
        .with_path(leaf)
        .with_context(context)
        .with_validation(config.validation_level());
    tracing::debug!(session = %session.id(), "starting build");
    let outcome = session.build(request);
    let stats = session.close();
    tracing::debug!(hits = stats.hits, misses = stats.misses, "parent cache");
    outcome
}

fn load_config(
    config_path: Option<PathBuf>,
    project_dir: Option<&Path>,
    cli: Option<serde_json::Value>,
) -> EffectiveConfig {
    let project_config = config_path.or_else(|| project_dir.map(|d| d.join(PROJECT_CONFIG_NAME)));
    let user_config = user_config_path();
    match EffectiveConfig::build(user_config.as_deref(), project_config.as_deref(), cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(EXIT_CODE_USAGE);
        }
    }
}

fn canonical_or_exit(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: cannot access {}: {}", path.display(), e);
            process::exit(EXIT_CODE_USAGE);
        }
    }
}

fn project_dir(descriptor: &Path) -> PathBuf {
    if descriptor.is_dir() {
        descriptor.to_path_buf()
    } else {
        descriptor
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn print_problems(problems: &[pom_builder::ModelProblem]) {
    for problem in problems {
        eprintln!("{}", problem);
    }
}

fn exit_code(error: &ModelBuildingError) -> i32 {
    match error {
        ModelBuildingError::Aborted { .. } => EXIT_CODE_ABORTED,
        ModelBuildingError::Problems(_) => 1,
    }
}
