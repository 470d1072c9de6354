use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::socket::PushSettings;
use crate::error::{ConfigError, PushError};
use crate::utils::{normalize_url, push_socket_url};

const CONFIG_FILE: &str = "paqueteria24.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "dev" | "development" => Some(Self::Development),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub enabled: bool,
    pub namespace: String,
    pub path: String,
    pub reconnect_delay_ms: u64,
    pub reconnect_delay_max_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "/notifications".into(),
            path: "/socket.io".into(),
            reconnect_delay_ms: 1000,
            reconnect_delay_max_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub development_url: String,
    pub production_url: String,
    /// Wins over the environment presets when set.
    pub base_url: Option<String>,
    pub push: PushConfig,
    pub poll_interval_secs: u64,
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            development_url: "http://localhost:3000".into(),
            production_url: "https://paqueteria24-back.onrender.com".into(),
            base_url: None,
            push: PushConfig::default(),
            poll_interval_secs: 30,
            data_dir: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn config_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|base| base.config_dir().to_path_buf())
    }

    /// Load from the user config dir, then apply `PAQ24_*` environment overrides.
    /// A first run writes the defaults out so there is a file to edit.
    pub fn load() -> Self {
        let mut config = match Self::config_dir() {
            Some(dir) => {
                let config = Self::load_from(&dir);
                if !dir.join(CONFIG_FILE).exists() {
                    match config.save_to(&dir) {
                        Ok(()) => log::info!("wrote default config to {}", dir.join(CONFIG_FILE).display()),
                        Err(e) => log::warn!("could not write default config: {e}"),
                    }
                }
                config
            }
            None => Self::new(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn load_from(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let Ok(text) = fs::read_to_string(&path) else {
            return Self::new();
        };
        toml::from_str(&text).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable {}: {e}", path.display());
            Self::new()
        })
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("PAQ24_ENV") {
            match Environment::parse(&env) {
                Some(env) => self.environment = env,
                None => log::warn!("ignoring unknown PAQ24_ENV={env}"),
            }
        }
        if let Some(url) = lookup("PAQ24_BACKEND_URL").filter(|u| !u.trim().is_empty()) {
            self.base_url = Some(url);
        }
    }

    pub fn save_to(&self, dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(CONFIG_FILE), toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn backend_url(&self) -> String {
        let raw = match (&self.base_url, self.environment) {
            (Some(url), _) => url.as_str(),
            (None, Environment::Development) => self.development_url.as_str(),
            (None, Environment::Production) => self.production_url.as_str(),
        };
        normalize_url(raw)
    }

    /// `None` when push is switched off; the dashboard then polls.
    pub fn push_settings(&self) -> Result<Option<PushSettings>, PushError> {
        if !self.push.enabled {
            return Ok(None);
        }
        Ok(Some(PushSettings {
            url: push_socket_url(&self.backend_url(), &self.push.path)?,
            namespace: self.push.namespace.clone(),
            reconnect_delay: Duration::from_millis(self.push.reconnect_delay_ms.max(1)),
            reconnect_delay_max: Duration::from_millis(
                self.push.reconnect_delay_max_ms.max(self.push.reconnect_delay_ms).max(1),
            ),
        }))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
