use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "SAST_SCA_CONFIG";

/// Configuration file looked up in the working directory when
/// [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "sast-sca.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub semgrep: SemgrepSettings,

    #[serde(default)]
    pub grype: GrypeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Largest message body the framing layer will accept.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemgrepSettings {
    #[serde(default = "default_semgrep_program")]
    pub program: String,

    #[serde(default = "default_semgrep_config")]
    pub default_config: String,

    #[serde(default = "default_semgrep_timeout", with = "humantime_serde")]
    pub default_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrypeSettings {
    #[serde(default = "default_grype_program")]
    pub program: String,

    #[serde(default = "default_grype_timeout", with = "humantime_serde")]
    pub default_timeout: Duration,
}

fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_semgrep_program() -> String {
    "semgrep".to_string()
}

fn default_semgrep_config() -> String {
    "auto".to_string()
}

fn default_semgrep_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_grype_program() -> String {
    "grype".to_string()
}

fn default_grype_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Default for SemgrepSettings {
    fn default() -> Self {
        Self {
            program: default_semgrep_program(),
            default_config: default_semgrep_config(),
            default_timeout: default_semgrep_timeout(),
        }
    }
}

impl Default for GrypeSettings {
    fn default() -> Self {
        Self {
            program: default_grype_program(),
            default_timeout: default_grype_timeout(),
        }
    }
}

impl ScanConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("Configuration file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from the file named by `SAST_SCA_CONFIG`, or `sast-sca.toml`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load(Path::new(&path))
    }
}
