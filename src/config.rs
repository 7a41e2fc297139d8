//! `config.toml` loading, validation and the `init` template.
//!
//! ```toml
//! debug = false
//! max_input_size = 104857600
//!
//! [log]
//! dir = "logs"
//! prefix = "codestep"
//! retention_days = 3
//! level = "debug"
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CodestepError;

/// 100 MB
pub const DEFAULT_MAX_INPUT_SIZE: usize = 100 * 1024 * 1024;

pub const DEFAULT_LOG_PREFIX: &str = "codestep";
pub const DEFAULT_RETENTION_DAYS: u16 = 3;
pub const DEFAULT_LOG_LEVEL: &str = "debug";

const CONFIG_FILE: &str = "config.toml";
const LOG_SUBDIR: &str = "logs";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Write debug logs even without `--debug`
    pub debug: bool,

    /// Largest accepted request body in bytes (0 disables the limit)
    pub max_input_size: usize,

    pub log: LogConfig,

    /// Directory the config file was read from; relative log paths resolve against it
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// The `[log]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Absolute, `~/`-prefixed or relative to the config directory
    pub dir: Option<PathBuf>,
    /// Log files are named `<prefix>.YYYY-MM-DD`
    pub prefix: String,
    /// Rotated files kept, and the age in days after which older files are pruned
    pub retention_days: u16,
    /// Level for this crate's events; `CODESTEP_LOG` overrides it entirely
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            log: LogConfig::default(),
            base_dir: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: DEFAULT_LOG_PREFIX.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Resolved log directory.
    pub fn log_dir(&self) -> PathBuf {
        let base = self.base_dir.clone().unwrap_or_else(ConfigService::config_dir);
        match &self.log.dir {
            None => base.join(LOG_SUBDIR),
            Some(dir) => match dir.strip_prefix("~") {
                Ok(rest) => home_dir().join(rest),
                Err(_) if dir.is_absolute() => dir.clone(),
                Err(_) => base.join(dir),
            },
        }
    }

    fn validate(&self) -> Result<()> {
        let prefix = &self.log.prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            bail!(CodestepError::invalid_request(format!(
                "log.prefix must be a bare file name, got {prefix:?}"
            )));
        }
        if self.log.retention_days == 0 {
            bail!(CodestepError::invalid_request(
                "log.retention_days must be at least 1"
            ));
        }
        Ok(())
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub struct ConfigService;

impl ConfigService {
    /// `~/.config/codestep`
    pub fn config_dir() -> PathBuf {
        home_dir().join(".config").join("codestep")
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE)
    }

    /// Load `path` (or the default location). A missing file yields defaults
    /// anchored at that file's directory; nothing is written.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };
        config.base_dir = path.parent().map(Path::to_path_buf);
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the commented template to `path`. An existing file is only replaced with `force`.
    pub fn write_template(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(CodestepError::invalid_request(format!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::template())
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    fn template() -> String {
        format!(
            r#"# codestep configuration

# Write debug logs even without --debug
debug = false

# Largest accepted request body in bytes, 0 for no limit
max_input_size = {DEFAULT_MAX_INPUT_SIZE}

[log]
# Directory for log files; relative paths are taken from this file's directory
# dir = "{LOG_SUBDIR}"

# Files are named <prefix>.YYYY-MM-DD
prefix = "{DEFAULT_LOG_PREFIX}"

# Rotated files kept, and days before older files are pruned
retention_days = {DEFAULT_RETENTION_DAYS}

# Level for codestep events (CODESTEP_LOG overrides, e.g. "codestep::engine=trace")
level = "{DEFAULT_LOG_LEVEL}"
"#
        )
    }
}
