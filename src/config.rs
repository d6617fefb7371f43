use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".habitrack";
const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_port: u16,
    pub stats_window_days: u32,
    pub logs_default_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_root_dir().join("db").join("habitrack.db"),
            api_port: 5000,
            stats_window_days: DEFAULT_WINDOW_DAYS,
            logs_default_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                if value.trim().is_empty() {
                    bail!("db_path must not be empty");
                }
                self.db_path = expand_home(value.trim());
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "stats_window_days" => {
                self.stats_window_days = parse_days("stats_window_days", value)?;
            }
            "logs_default_days" => {
                self.logs_default_days = parse_days("logs_default_days", value)?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, api_port|api.port, stats_window_days|stats.window_days, logs_default_days|logs.default_days"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "stats_window_days" => Some(self.stats_window_days.to_string()),
            "logs_default_days" => Some(self.logs_default_days.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "api_port" | "api.port" => "api_port",
        "stats_window_days" | "stats.window_days" => "stats_window_days",
        "logs_default_days" | "logs.default_days" => "logs_default_days",
        _ => key,
    }
}

fn parse_days(key: &str, value: &str) -> Result<u32> {
    let days = value
        .parse::<u32>()
        .map_err(|_| anyhow!("{key} must be a number"))?;
    if days == 0 {
        bail!("{key} must be at least 1");
    }
    Ok(days)
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
