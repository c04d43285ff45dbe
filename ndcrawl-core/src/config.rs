// Configuration file model

use ndcrawl_scanner::model::DeviceOs;
use ndcrawl_scanner::{CrawlConfig, Result, ScanError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/ndcrawl/";
pub const CONFIG_FILE_NAME: &str = "ndcrawl.json";

/// Options read from `ndcrawl.json`. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NdConfig {
    pub seed_os: DeviceOs,
    pub max_crawl: usize,
    pub thread_count: usize,
    pub ignore_regex: String,
    pub log_file: Option<String>,
    pub join_timeout_secs: u64,
}

impl Default for NdConfig {
    fn default() -> Self {
        Self {
            seed_os: DeviceOs::CiscoIos,
            max_crawl: 10_000,
            thread_count: 100,
            ignore_regex: String::new(),
            log_file: None,
            join_timeout_secs: 30,
        }
    }
}

/// Tilde-expand a user supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// `~/.config/ndcrawl/ndcrawl.json`, expanded.
pub fn default_config_path() -> PathBuf {
    expand_path(DEFAULT_CONFIG_DIR).join(CONFIG_FILE_NAME)
}

impl NdConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        let config: NdConfig = serde_json::from_str(content)
            .map_err(|e| ScanError::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load an explicitly named file, or the default file when it exists.
    /// With neither, the defaults are used.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(&expand_path(path)),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    debug!("No configuration at {}, using defaults", default_path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::Other(format!("failed to serialize configuration: {}", e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.crawl_config().validate().map(|_| ())
    }

    /// Scanner options for these settings. Timing knobs the file does not
    /// carry keep their crawler defaults.
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            seed_os: self.seed_os,
            max_crawl: self.max_crawl,
            thread_count: self.thread_count,
            ignore_regex: self.ignore_regex.clone(),
            join_timeout: Duration::from_secs(self.join_timeout_secs),
            ..CrawlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = NdConfig::default();
        assert_eq!(config.seed_os, DeviceOs::CiscoIos);
        assert_eq!(config.max_crawl, 10_000);
        assert_eq!(config.thread_count, 100);
        assert!(config.ignore_regex.is_empty());
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_crawl_config_carries_values() {
        let config = NdConfig {
            seed_os: DeviceOs::CiscoNxos,
            join_timeout_secs: 5,
            ..NdConfig::default()
        };
        let crawl = config.crawl_config();
        assert_eq!(crawl.seed_os, DeviceOs::CiscoNxos);
        assert_eq!(crawl.join_timeout, Duration::from_secs(5));
        assert_eq!(crawl.dispatch_delay, CrawlConfig::default().dispatch_delay);
    }
}
