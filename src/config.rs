use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file '{path}': {source}")]
    IO {
        path: String,
        source: std::io::Error,
    },
    #[error("unable to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

// Every key is optional, see `Default` for the values used when absent
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Reject chunks whose stored crc is wrong instead of restamping them
    pub verify_crc: bool,
    pub on_error: BatchPolicy,
    /// Default dump format
    pub human: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Stop at the first file that fails
    Abort,
    /// Log the failure and move on to the next file
    Continue,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verify_crc: true,
            on_error: BatchPolicy::Abort,
            human: false,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IO {
            path: path.display().to_string(),
            source,
        })?;

        Config::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
