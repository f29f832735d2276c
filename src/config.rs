use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::input::SLIDER_DEFAULT;

pub const DEFAULT_URL: &str = "ws://192.168.4.1/ws";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;
pub const URL_ENV: &str = "IRMP_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub url: String,
    pub reconnect_delay_ms: u64,
    pub slider_default: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            url: DEFAULT_URL.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            slider_default: SLIDER_DEFAULT,
        }
    }
}

impl LinkConfig {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Defaults, then the file if given, then the environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => LinkConfig::load(p)?,
            None => LinkConfig::default(),
        };
        config.apply_env(std::env::var(URL_ENV).ok());
        Ok(config)
    }

    fn apply_env(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.url = url;
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
