//! Child process configuration
//!
//! Chooses the shell, its arguments, working directory and the environment
//! the child starts with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_TERM: &str = "xterm-256color";
pub const DEFAULT_COLORTERM: &str = "truecolor";
pub const DEFAULT_LANG: &str = "en_US.UTF-8";

/// Flag passed to the shell so it runs as a login shell
const LOGIN_FLAG: &str = "-l";

/// The user's shell: `$SHELL`, else the platform default
pub fn default_shell() -> String {
    match std::env::var("SHELL") {
        Ok(shell) if !shell.is_empty() => shell,
        _ => platform_shell().to_string(),
    }
}

fn platform_shell() -> &'static str {
    if cfg!(target_os = "macos") {
        "/bin/zsh"
    } else if cfg!(target_os = "linux") {
        "/bin/bash"
    } else {
        "/bin/sh"
    }
}

/// Everything needed to launch a child on the slave side of a pty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Program to execute. Looked up in `PATH` when it has no slash.
    pub program: String,
    /// Arguments after argv[0]
    pub args: Vec<String>,
    /// Working directory; `None` means `$HOME`, falling back to `/`
    pub cwd: Option<PathBuf>,
    /// Value for `TERM`
    pub term: String,
    /// Value for `COLORTERM`
    pub colorterm: String,
    /// Value for `LANG`/`LC_ALL` when the parent has none
    pub lang: String,
    /// Extra variables, applied last
    pub env: BTreeMap<String, String>,
    /// Start from the parent's environment
    pub inherit_env: bool,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self::login_shell()
    }
}

impl SpawnConfig {
    /// Run `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            term: DEFAULT_TERM.to_string(),
            colorterm: DEFAULT_COLORTERM.to_string(),
            lang: DEFAULT_LANG.to_string(),
            env: BTreeMap::new(),
            inherit_env: true,
        }
    }

    /// The platform's default shell as a login shell
    pub fn login_shell() -> Self {
        Self::new(default_shell()).arg(LOGIN_FLAG)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Directory the child starts in
    pub fn resolve_cwd(&self) -> PathBuf {
        if let Some(cwd) = &self.cwd {
            return cwd.clone();
        }
        match std::env::var_os("HOME") {
            Some(home) if Path::new(&home).is_dir() => PathBuf::from(home),
            _ => PathBuf::from("/"),
        }
    }

    /// The complete environment of the child, sorted by name
    pub fn build_env(&self) -> Vec<(String, String)> {
        let mut vars: BTreeMap<String, String> = if self.inherit_env {
            std::env::vars().collect()
        } else {
            BTreeMap::new()
        };

        vars.insert("TERM".to_string(), self.term.clone());
        vars.insert("COLORTERM".to_string(), self.colorterm.clone());
        for key in ["LANG", "LC_ALL"] {
            vars.entry(key.to_string())
                .or_insert_with(|| self.lang.clone());
        }
        vars.insert("SHELL".to_string(), self.program.clone());

        for (key, value) in &self.env {
            vars.insert(key.clone(), value.clone());
        }
        vars.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(env: &'a [(String, String)], key: &str) -> Option<&'a str> {
        env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_login_shell_has_login_flag() {
        let config = SpawnConfig::login_shell();
        assert_eq!(config.args, vec!["-l".to_string()]);
        assert!(!config.program.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let config = SpawnConfig::new("/bin/sh").env("FOO", "bar").env("TERM", "dumb");
        let env = config.build_env();
        assert_eq!(lookup(&env, "FOO"), Some("bar"));
        // Explicit overrides win over the defaults
        assert_eq!(lookup(&env, "TERM"), Some("dumb"));
        assert_eq!(lookup(&env, "COLORTERM"), Some("truecolor"));
        assert_eq!(lookup(&env, "SHELL"), Some("/bin/sh"));
    }

    #[test]
    fn test_clean_env_gets_locale_defaults() {
        let mut config = SpawnConfig::new("/bin/sh");
        config.inherit_env = false;
        let env = config.build_env();
        assert_eq!(lookup(&env, "LANG"), Some(DEFAULT_LANG));
        assert_eq!(lookup(&env, "LC_ALL"), Some(DEFAULT_LANG));
        assert_eq!(lookup(&env, "TERM"), Some(DEFAULT_TERM));
        assert_eq!(env.len(), 5);
    }

    #[test]
    fn test_explicit_cwd() {
        let config = SpawnConfig::new("/bin/sh").cwd("/tmp");
        assert_eq!(config.resolve_cwd(), PathBuf::from("/tmp"));
        assert!(SpawnConfig::new("/bin/sh").resolve_cwd().is_absolute());
    }

    #[test]
    fn test_builder_args() {
        let config = SpawnConfig::new("/bin/sh").args(["-c", "echo hi"]);
        assert_eq!(config.args, vec!["-c", "echo hi"]);
    }
}
