//! Pipeline configuration loading.

use fremantle::{ExecutionMode, PipelineConfig};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// IO error
    #[error("Cannot read config {path}: {source}")]
    Io {
        /// Config file path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// JSON error
    #[error("Invalid config {path}: {source}")]
    Json {
        /// Config file path
        path: String,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Command-line settings that take precedence over the config file.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Overrides {
    pub(crate) parallel: bool,
    pub(crate) workers: Option<usize>,
    pub(crate) cooldown_secs: Option<u64>,
}

/// Load the JSON config at `path`, or the defaults when no path is given.
///
/// Missing fields take their default values.
pub(crate) fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Apply command-line overrides.
pub(crate) fn apply_overrides(mut config: PipelineConfig, overrides: Overrides) -> PipelineConfig {
    if overrides.parallel {
        config.mode = ExecutionMode::Parallel;
    }
    if let Some(workers) = overrides.workers {
        config.workers = workers;
    }
    if let Some(secs) = overrides.cooldown_secs {
        config.cooldown_secs = secs;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        assert_eq!(load_config(None).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"cooldown_secs": 5, "orthogonalize": {"fit_intercept": true}}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.cooldown_secs, 5);
        assert!(config.orthogonalize.fit_intercept);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Json { .. })
        ));
        assert!(matches!(
            load_config(Some(&dir.path().join("missing.json"))),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_overrides_win() {
        let config = apply_overrides(
            PipelineConfig::default(),
            Overrides {
                parallel: true,
                workers: Some(2),
                cooldown_secs: Some(0),
            },
        );
        assert_eq!(config.mode, ExecutionMode::Parallel);
        assert_eq!(config.workers, 2);
        assert_eq!(config.cooldown_secs, 0);
    }
}
