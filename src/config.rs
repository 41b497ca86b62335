use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watch::DebounceSettings;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WEBPWATCH_CONFIG";

/// Config file looked up in the current directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "webpwatch.toml";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// File this config was read from; `None` when built-in defaults are used.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            watch: WatchConfig::default(),
            notify: NotifyConfig::default(),
            source: None,
        }
    }
}

/// Which folders to watch and how long to wait for them to go quiet
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Directories to watch (non-recursively). `~` is expanded.
    /// Empty means `~/Downloads` and `~/Pictures`.
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Optional ceiling on how long a burst may postpone its conversion.
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            settle_ms: default_settle_ms(),
            max_wait_ms: None,
        }
    }
}

/// Desktop notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_enabled")]
    pub enabled: bool,
    #[serde(default = "default_notify_title")]
    pub title: String,
    #[serde(default)]
    pub icon: Option<PathBuf>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_notify_enabled(),
            title: default_notify_title(),
            icon: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_settle_ms() -> u64 {
    250
}

fn default_notify_enabled() -> bool {
    true
}

fn default_notify_title() -> String {
    "WebP Converter".to_string()
}

/// Folders watched when none are configured, relative to the home directory.
const DEFAULT_ROOTS: &[&str] = &["Downloads", "Pictures"];

impl Config {
    /// Load configuration
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for a config file in this order:
    /// 1. `explicit` (e.g. `--config`); must exist
    /// 2. Path in the WEBPWATCH_CONFIG environment variable; must exist
    /// 3. ./webpwatch.toml if present
    ///
    /// Falls back to built-in defaults when none of these apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_overrides(explicit, |_| {})
    }

    /// Like [`Config::load`], but lets the caller (e.g. CLI flags) adjust
    /// values before validation runs.
    pub fn load_with_overrides(
        explicit: Option<&Path>,
        apply: impl FnOnce(&mut Config),
    ) -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => match std::env::var(CONFIG_ENV) {
                Ok(p) => Some(PathBuf::from(p)),
                Err(_) => {
                    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                    local.is_file().then_some(local)
                }
            },
        };

        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };

        apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file without validating it
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.watch.settle_ms == 0 {
            anyhow::bail!("watch.settle_ms must be greater than 0");
        }

        if let Some(max_wait) = self.watch.max_wait_ms {
            if max_wait < self.watch.settle_ms {
                anyhow::bail!(
                    "watch.max_wait_ms ({}) must be at least watch.settle_ms ({})",
                    max_wait,
                    self.watch.settle_ms
                );
            }
        }

        if self.watch.roots.iter().any(|r| r.trim().is_empty()) {
            anyhow::bail!("watch.roots must not contain empty paths");
        }

        Ok(())
    }

    /// Debounce timing derived from the `[watch]` section
    pub fn debounce(&self) -> DebounceSettings {
        DebounceSettings::new(Duration::from_millis(self.watch.settle_ms))
            .with_max_wait(self.watch.max_wait_ms.map(Duration::from_millis))
    }

    /// Resolve the watched directories.
    ///
    /// Fails only when the home directory is needed (default roots or a `~`
    /// entry) and can't be determined.
    pub fn resolve_roots(&self) -> Result<Vec<PathBuf>> {
        if self.watch.roots.is_empty() {
            let home = home_dir()?;
            return Ok(DEFAULT_ROOTS.iter().map(|d| home.join(d)).collect());
        }

        self.watch
            .roots
            .iter()
            .map(|root| {
                let expanded = shellexpand::tilde(root);
                if expanded.starts_with('~') {
                    // shellexpand leaves `~` alone when it can't find a home dir
                    anyhow::bail!("Unable to find home directory for root: {}", root);
                }
                Ok(PathBuf::from(expanded.into_owned()))
            })
            .collect()
    }
}

fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .context("Unable to find home directory")
}
