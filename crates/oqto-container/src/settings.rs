//! Engine connection settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file in the
//! user's config directory, then `OQTO_CONTAINER__*` environment variables.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::engine::{EngineResult, RuntimeType};

const APP_NAME: &str = "oqto-container";

/// How to reach the container engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Container runtime type: "docker" or "podman" (auto-detected if not set)
    pub runtime: Option<RuntimeType>,
    /// Custom path to the container runtime binary
    pub binary: Option<String>,
    /// Stop grace period in seconds when none is given (engine default if unset)
    pub stop_timeout_secs: Option<u32>,
}

impl EngineSettings {
    /// Load settings from the default config file and the environment.
    pub fn load() -> EngineResult<Self> {
        match default_config_file() {
            Some(path) => Self::load_from(&path),
            None => Self::build(None, environment()),
        }
    }

    /// Load settings from `path` (if it exists) and the environment.
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        Self::build(Some(path), environment())
    }

    fn build(path: Option<&Path>, env: Environment) -> EngineResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let built = builder.add_source(env).build()?;

        Ok(built.try_deserialize()?)
    }
}

/// `<config dir>/oqto-container/config.toml`, honouring `XDG_CONFIG_HOME`.
pub fn default_config_file() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join("config.toml"))
}

fn default_config_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(dir) = dirs::config_dir() {
        return Some(dir.join(APP_NAME));
    }

    dirs::home_dir().map(|home| home.join(".config").join(APP_NAME))
}

fn environment() -> Environment {
    Environment::with_prefix(&env_prefix()).separator("__")
}

fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
