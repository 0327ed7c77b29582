//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use met_core::EngineConfig;

/// Application configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL for `met send`.
    pub endpoint: Option<String>,

    /// Visitor ID to report under.
    pub visitor_id: Option<String>,

    /// Engine tuning overrides.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("visitor_id", &self.visitor_id)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (MET_*)
        figment = figment.merge(Env::prefixed("MET_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for met.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("met"))
}
