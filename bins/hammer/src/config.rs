use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct HammerConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::readers")]
    pub readers: usize,
    #[serde(default = "defaults::writers")]
    pub writers: usize,
    /// Writer critical sections per writer thread.
    #[serde(default = "defaults::iterations")]
    pub iterations: u64,
    /// Seed for the sequence counter; set near u64::MAX to exercise
    /// wraparound. Must be even.
    #[serde(default)]
    pub initial_sequence: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("initial_sequence must be even, got {0}")]
    OddInitialSequence(u64),
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn readers() -> usize {
        4
    }

    pub fn writers() -> usize {
        2
    }

    pub fn iterations() -> u64 {
        1_000_000
    }
}

impl Default for HammerConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            readers: defaults::readers(),
            writers: defaults::writers(),
            iterations: defaults::iterations(),
            initial_sequence: 0,
        }
    }
}

impl HammerConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: HammerConfig = toml::from_str(&toml_str)?;
        config.check()
    }

    pub fn check(self) -> Result<Self, ConfigError> {
        if self.initial_sequence & 1 == 1 {
            return Err(ConfigError::OddInitialSequence(self.initial_sequence));
        }
        Ok(self)
    }
}
