//! Configuration for shellterm sessions

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::parser::MAX_OSC_LEN;
use crate::pty::{
    default_shell, SpawnConfig, WindowSize, DEFAULT_COLORTERM, DEFAULT_LANG, DEFAULT_TERM,
};

/// Session configuration. Missing fields take their defaults, so a partial
/// file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell to run; `None` picks the platform default
    pub shell: Option<String>,
    /// Arguments passed to the shell
    pub args: Vec<String>,
    /// Working directory; `None` means `$HOME`
    pub cwd: Option<PathBuf>,
    /// Initial size in columns
    pub cols: u16,
    /// Initial size in rows
    pub rows: u16,
    /// Maximum scrollback lines, `None` for unbounded
    pub scrollback_limit: Option<usize>,
    pub term: String,
    pub colorterm: String,
    /// Locale for `LANG`/`LC_ALL` when the environment has none
    pub lang: String,
    /// Extra environment variables for the child
    pub env: BTreeMap<String, String>,
    /// Bytes sent to the shell once after it starts
    pub startup_input: Option<String>,
    /// Longest OSC payload kept before truncation
    pub max_osc_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            args: vec!["-l".to_string()],
            cwd: None,
            cols: 80,
            rows: 24,
            scrollback_limit: None,
            term: DEFAULT_TERM.to_string(),
            colorterm: DEFAULT_COLORTERM.to_string(),
            lang: DEFAULT_LANG.to_string(),
            env: BTreeMap::new(),
            startup_input: None,
            max_osc_len: MAX_OSC_LEN,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file, creating its directory
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from the default location, or return the default
    /// config when there is none or it cannot be read
    pub fn load_or_default() -> Self {
        let Some(path) = default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// The spawn configuration this config describes
    pub fn spawn_config(&self) -> SpawnConfig {
        let mut spawn = SpawnConfig::new(self.shell.clone().unwrap_or_else(default_shell))
            .args(self.args.iter().cloned());
        spawn.cwd = self.cwd.clone();
        spawn.term = self.term.clone();
        spawn.colorterm = self.colorterm.clone();
        spawn.lang = self.lang.clone();
        spawn.env = self.env.clone();
        spawn
    }

    pub fn window_size(&self) -> WindowSize {
        WindowSize::new(self.cols, self.rows)
    }
}

/// `$XDG_CONFIG_HOME/shellterm/config.json`, else
/// `~/.config/shellterm/config.json`
pub fn default_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("shellterm").join("config.json"))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
