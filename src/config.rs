//! cchistory configuration.
//!
//! Loaded from `~/.cchistory/config.toml`. Every key is optional and a
//! missing file means defaults.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::history::DEFAULT_SHELL_TOOLS;

/// Environment variable overriding the projects root.
pub const PROJECTS_DIR_ENV: &str = "CCHISTORY_PROJECTS_DIR";

/// cchistory configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Directory holding one subdirectory per project.
    pub projects_dir: Option<PathBuf>,

    /// Tool names whose invocations are shell commands.
    pub shell_tools: Vec<String>,

    /// Show failed commands without passing `--include-failed`.
    pub include_failed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_dir: None,
            shell_tools: DEFAULT_SHELL_TOOLS.iter().map(ToString::to_string).collect(),
            include_failed: false,
        }
    }
}

impl Config {
    /// Load config from `~/.cchistory/config.toml`, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from a specific file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        if config.shell_tools.iter().all(|t| t.trim().is_empty()) {
            return Err(format!(
                "shell-tools is empty in {}\n\
                 List at least one tool name, e.g. shell-tools = [\"Bash\"]",
                path.display()
            ));
        }

        Ok(config)
    }

    /// The config file path: `~/.cchistory/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".cchistory").join("config.toml"))
    }

    /// Resolve the projects root.
    ///
    /// Checks in order: the explicit `--projects-dir` value, the
    /// `CCHISTORY_PROJECTS_DIR` env var, the config file, and finally
    /// `~/.claude/projects`.
    pub fn projects_root(&self, explicit: Option<&Path>) -> Result<PathBuf, String> {
        let from_env = env::var_os(PROJECTS_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.projects_root_with(explicit, from_env)
    }

    fn projects_root_with(
        &self,
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
    ) -> Result<PathBuf, String> {
        // 1. --projects-dir flag.
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }

        // 2. Environment.
        if let Some(dir) = from_env {
            return Ok(dir);
        }

        // 3. Config file.
        if let Some(dir) = &self.projects_dir {
            return Ok(dir.clone());
        }

        // 4. Default location.
        dirs::home_dir()
            .map(|h| h.join(".claude").join("projects"))
            .ok_or_else(|| "could not determine home directory".to_string())
    }
}
