#![forbid(unsafe_code)]

mod checks;
mod error;
mod monitor;
mod notifications;
mod paths;
mod telegram;

pub use checks::Checks;
pub use error::Error;
pub use monitor::{
    DEFAULT_INTERVAL, DEFAULT_PROBE_TIMEOUT, DEFAULT_SHUTDOWN_GRACE, MIN_INTERVAL, Monitor,
};
pub use notifications::Notifications;
pub use paths::Paths;
pub use telegram::{DEFAULT_API_BASE, Telegram};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variables with this prefix override file values, `__`
/// separating nested keys (`SECWATCH_TELEGRAM__TOKEN`).
pub const ENV_PREFIX: &str = "SECWATCH_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub monitor: Monitor,
    pub checks: Checks,
    pub notifications: Notifications,
    pub telegram: Telegram,
    pub paths: Paths,
}

impl Config {
    /// Built-in defaults, no file and no environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults, then the TOML file at `path`, then `SECWATCH_*`
    /// environment overrides. Relative paths are anchored at the directory
    /// holding the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_owned()));
        }
        let path = path.canonicalize()?;
        let base = path
            .parent()
            .ok_or_else(|| Error::InvalidPath(path.clone()))?;

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config.finish(base))
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml(document: &str, base: impl AsRef<Path>) -> Result<Self, Error> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(document))
            .extract()?;
        Ok(config.finish(base.as_ref()))
    }

    /// Render as a TOML document.
    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml_edit::ser::to_string_pretty(self)?)
    }

    pub fn clamp(self) -> Self {
        Self {
            monitor: self.monitor.clamp(),
            ..self
        }
    }

    fn finish(self, base: &Path) -> Self {
        let config = self.clamp();
        Self {
            paths: config.paths.resolve(base),
            ..config
        }
    }
}
