use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::github::client::DEFAULT_API_URL;

pub const CONFIG_FILE: &str = ".pr-metrics.toml";
const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-metrics.toml.
/// All fields are optional; command-line flags override anything set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// REST base URL, for GitHub Enterprise (e.g. https://ghe.example.com/api/v3)
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the CSV files
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from .pr-metrics.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: an explicit value wins, then the config file,
    /// then the GITHUB_TOKEN env var.
    pub fn github_token(&self, explicit: Option<&str>) -> Option<String> {
        let non_blank = |token: &String| !token.trim().is_empty();
        explicit
            .map(str::to_string)
            .filter(non_blank)
            .or_else(|| self.github.token.clone().filter(non_blank))
            .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(non_blank))
    }

    pub fn api_url(&self, explicit: Option<&str>) -> String {
        explicit
            .or(self.github.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
            .to_string()
    }

    pub fn output_dir(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.output.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}
