//! Assessor configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::progress::DEFAULT_THRESHOLD_PERCENT;

/// Top-level assessor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessorConfig {
    /// Root of the file store (assessments, attempts, progress).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Learner id used when a command is not given `--user`.
    #[serde(default = "default_user")]
    pub default_user: String,
    /// Watched share of the lecture that opens a prerequisite gate.
    #[serde(default = "default_threshold")]
    pub prerequisite_threshold_percent: u32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./assessor-data")
}
fn default_user() -> String {
    "learner".to_string()
}
fn default_threshold() -> u32 {
    DEFAULT_THRESHOLD_PERCENT
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_user: default_user(),
            prerequisite_threshold_percent: default_threshold(),
        }
    }
}

impl AssessorConfig {
    /// Where the progress gate reads watched percentages from.
    pub fn progress_path(&self) -> PathBuf {
        self.data_dir.join("progress.json")
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// One left-to-right pass: substituted values are copied through as-is and
/// never expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start + 2..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + 2 + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + 2 + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `assessor.toml` in the current directory
/// 2. `~/.config/assessor/config.toml`
///
/// Environment variable overrides: `ASSESSOR_DATA_DIR`, `ASSESSOR_USER`.
pub fn load_config() -> Result<AssessorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AssessorConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("assessor.toml");
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
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AssessorConfig::default(),
    };

    if let Ok(dir) = std::env::var("ASSESSOR_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(user) = std::env::var("ASSESSOR_USER") {
        config.default_user = user;
    }

    config.data_dir = PathBuf::from(resolve_env_vars(&config.data_dir.to_string_lossy()));
    config.default_user = resolve_env_vars(&config.default_user);

    anyhow::ensure!(
        config.prerequisite_threshold_percent <= 100,
        "prerequisite_threshold_percent must be at most 100, got {}",
        config.prerequisite_threshold_percent
    );

    Ok(config)
}

fn parse_config(content: &str) -> Result<AssessorConfig> {
    Ok(toml::from_str(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("assessor"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_ASSESSOR_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_ASSESSOR_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_ASSESSOR_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_ASSESSOR_TEST_VAR");
    }

    #[test]
    fn self_referencing_value_is_expanded_once() {
        std::env::set_var("_ASSESSOR_TEST_SELF", "${_ASSESSOR_TEST_SELF}");
        assert_eq!(
            resolve_env_vars("${_ASSESSOR_TEST_SELF}/data"),
            "${_ASSESSOR_TEST_SELF}/data"
        );
        std::env::remove_var("_ASSESSOR_TEST_SELF");
    }

    #[test]
    fn unset_variable_expands_to_empty() {
        assert_eq!(resolve_env_vars("a${_ASSESSOR_TEST_UNSET}b"), "ab");
    }

    #[test]
    fn unterminated_reference_is_kept() {
        assert_eq!(resolve_env_vars("${OPEN"), "${OPEN");
    }

    #[test]
    fn default_config() {
        let config = AssessorConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./assessor-data"));
        assert_eq!(config.prerequisite_threshold_percent, 90);
        assert_eq!(
            config.progress_path(),
            PathBuf::from("./assessor-data/progress.json")
        );
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
data_dir = "/var/lib/assessor"
prerequisite_threshold_percent = 75
"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/assessor"));
        assert_eq!(config.default_user, "learner");
        assert_eq!(config.prerequisite_threshold_percent, 75);
    }

    #[test]
    fn explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessor.toml");
        std::fs::write(&path, "default_user = \"ada\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        if std::env::var("ASSESSOR_USER").is_err() {
            assert_eq!(config.default_user, "ada");
        }
    }

    #[test]
    fn threshold_over_100_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessor.toml");
        std::fs::write(&path, "prerequisite_threshold_percent = 150\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());
    }
}
