//! Proctor configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the autosave store path.
pub const STORE_PATH_ENV: &str = "PROCTOR_STORE_PATH";

/// Top-level proctor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProctorConfig {
    /// Directory of rubric files layered over the built-in rubrics.
    #[serde(default)]
    pub rubric_dir: Option<PathBuf>,
    /// File holding the autosave slot.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Category used when none is given.
    #[serde(default = "default_category")]
    pub default_category: String,
    /// Budget used when a session is started without one.
    #[serde(default = "default_budget")]
    pub default_budget_minutes: u64,
    /// Output directory for attempt records and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./.proctor/attempt.json")
}
fn default_category() -> String {
    "html".to_string()
}
fn default_budget() -> u64 {
    60
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./proctor-results")
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            rubric_dir: None,
            store_path: default_store_path(),
            default_category: default_category(),
            default_budget_minutes: default_budget(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("${") {
        let Some(len) = rest[open + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = &rest[open + 2..open + 2 + len];
        out.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[open + 3 + len..];
    }
    out.push_str(rest);
    out
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

impl ProctorConfig {
    /// Resolve `${VAR}` references in every path field.
    fn resolve_paths(mut self) -> Self {
        self.rubric_dir = self.rubric_dir.as_deref().map(resolve_path);
        self.store_path = resolve_path(&self.store_path);
        self.output_dir = resolve_path(&self.output_dir);
        self
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `proctor.toml` in the current directory
/// 2. `~/.config/proctor/config.toml`
///
/// Environment variable override: `PROCTOR_STORE_PATH`.
pub fn load_config() -> Result<ProctorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ProctorConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("proctor.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config(&path)?
        }
        None => ProctorConfig::default(),
    };

    if let Ok(store) = std::env::var(STORE_PATH_ENV) {
        if !store.trim().is_empty() {
            config.store_path = PathBuf::from(store);
        }
    }

    Ok(config.resolve_paths())
}

fn parse_config(path: &Path) -> Result<ProctorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<ProctorConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("proctor"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_PROCTOR_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_PROCTOR_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_PROCTOR_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_PROCTOR_UNSET_VAR_XYZ}/x"), "/x");
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_PROCTOR_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ProctorConfig::default();
        assert_eq!(config.default_category, "html");
        assert_eq!(config.default_budget_minutes, 60);
        assert_eq!(config.store_path, PathBuf::from("./.proctor/attempt.json"));
        assert!(config.rubric_dir.is_none());
    }

    #[test]
    fn parse_partial_config() {
        let config: ProctorConfig = toml::from_str(
            r#"
default_category = "css"
rubric_dir = "rubrics"
"#,
        )
        .unwrap();
        assert_eq!(config.default_category, "css");
        assert_eq!(config.rubric_dir, Some(PathBuf::from("rubrics")));
        assert_eq!(config.output_dir, PathBuf::from("./proctor-results"));
    }

    #[test]
    fn explicit_path_resolves_env_vars() {
        std::env::set_var("_PROCTOR_TEST_ROOT", "/tmp/proctor-root");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proctor.toml");
        std::fs::write(
            &path,
            "output_dir = \"${_PROCTOR_TEST_ROOT}/out\"\ndefault_budget_minutes = 45\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/proctor-root/out"));
        assert_eq!(config.default_budget_minutes, 45);
        std::env::remove_var("_PROCTOR_TEST_ROOT");
    }

    #[test]
    fn missing_explicit_path_fails() {
        assert!(load_config_from(Some(Path::new("/nonexistent/proctor.toml"))).is_err());
    }

    #[test]
    fn malformed_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proctor.toml");
        std::fs::write(&path, "default_budget_minutes = \"soon\"").unwrap();
        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
