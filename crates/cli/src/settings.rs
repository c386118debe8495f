// Layered engine settings: defaults -> TOML file -> FANOUT_* environment

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use fanout_core::EngineConfig;
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "~/.fanout/config.toml";
const ENV_PREFIX: &str = "FANOUT";

/// Flag values that override file and environment settings
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub capacity: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub show_progress: bool,
    pub verbose: bool,
}

/// Load settings from the default locations.
///
/// An explicit `--config` path must exist; the default path is optional.
pub fn load(explicit_path: Option<&Path>) -> Result<EngineConfig> {
    load_from(explicit_path, None)
}

/// Same as [`load`], with the environment replaced by `env` when given
pub fn load_from(
    explicit_path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<EngineConfig> {
    let (path, required) = match explicit_path {
        Some(path) => (path.to_string_lossy().into_owned(), true),
        None => (shellexpand::tilde(DEFAULT_CONFIG_PATH).into_owned(), false),
    };

    let settings = Config::builder()
        .add_source(File::new(&path, FileFormat::Toml).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        )
        .build()
        .with_context(|| format!("Failed to load settings from {}", path))?;

    settings
        .try_deserialize::<EngineConfig>()
        .context("Invalid engine settings")
}

/// Apply command-line overrides and validate the result
pub fn resolve(mut config: EngineConfig, overrides: &Overrides) -> Result<EngineConfig> {
    if let Some(capacity) = overrides.capacity {
        config.capacity = capacity;
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
    config.show_progress |= overrides.show_progress;
    config.verbose |= overrides.verbose;

    config.validate().context("Invalid engine settings")?;
    Ok(config)
}
