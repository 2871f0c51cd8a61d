//! Configuration loader.
//!
//! Files are TOML. Before parsing, `${VAR}` is replaced by the environment
//! variable's value and `${VAR:-fallback}` falls back when it is unset.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ConfigError;
use crate::schema::{Config, auto_accept_dir};

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid env var regex")
});

pub struct ConfigLoader;

impl ConfigLoader {
    /// `~/.auto-accept/config.toml`.
    pub fn default_path() -> PathBuf {
        auto_accept_dir().join("config.toml")
    }

    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_str(&content)
    }

    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        if let Some(path) = config.coordinator.state_path.take() {
            config.coordinator.state_path = Some(Self::expand_path(&path.to_string_lossy()).into());
        }
        Ok(config)
    }

    /// `path` when given (it must exist), else the default file when
    /// present, else built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load(path);
        }

        let default = Self::default_path();
        if default.exists() {
            Self::load(&default)
        } else {
            Ok(Config::default())
        }
    }

    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut missing = None;
        let expanded = ENV_VAR_RE.replace_all(content, |caps: &Captures<'_>| {
            match (std::env::var(&caps[1]), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(fallback)) => fallback.as_str().to_string(),
                (Err(_), None) => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(var) => Err(ConfigError::EnvVarNotSet(var)),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Tilde expansion, e.g. `~/.auto-accept`.
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}
