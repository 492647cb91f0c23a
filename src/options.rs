//! Compiler options, loadable from TOML.
//!
//! ```toml
//! [projection]
//! root_parameter = "x"
//!
//! [filter]
//! root_parameter = "x"
//! in_separator = ","
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "QPROJ_CONFIG";

/// Options shared by the projection and filter compilers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Projection compiler settings.
    pub projection: ProjectionOptions,
    /// Filter compiler settings.
    pub filter: FilterOptions,
}

/// `[projection]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectionOptions {
    /// Name given to a root parameter the compiler creates itself.
    pub root_parameter: String,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            root_parameter: "x".to_string(),
        }
    }
}

/// `[filter]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Name given to a root parameter the compiler creates itself.
    pub root_parameter: String,
    /// Separator between `In` tokens.
    pub in_separator: String,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            root_parameter: "x".to_string(),
            in_separator: ",".to_string(),
        }
    }
}

/// Failures while loading options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for these options.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File path, or `<inline>` for string input.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A value parsed but is unusable.
    #[error("config value '{field}' is invalid: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl CompilerOptions {
    /// Parses options from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let options: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Loads from `explicit`, else `$QPROJ_CONFIG`, else the per-user config
    /// file. A missing implicit file yields defaults; a missing explicit one
    /// is an error.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(&path);
        }
        let implicit = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(default_config_path);
        match implicit {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.projection.root_parameter.is_empty() {
            return Err(ConfigError::Invalid {
                field: "projection.root_parameter",
                reason: "must not be empty",
            });
        }
        if self.filter.root_parameter.is_empty() {
            return Err(ConfigError::Invalid {
                field: "filter.root_parameter",
                reason: "must not be empty",
            });
        }
        if self.filter.in_separator.is_empty() {
            return Err(ConfigError::Invalid {
                field: "filter.in_separator",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// Per-user config location, `<config dir>/qproj/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("qproj").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_keys_keep_defaults() {
        let options = CompilerOptions::from_toml_str("[filter]\nin_separator = \";\"\n").unwrap();
        assert_eq!(options.filter.in_separator, ";");
        assert_eq!(options.filter.root_parameter, "x");
        assert_eq!(options.projection, ProjectionOptions::default());
    }

    #[test]
    fn empty_separator_is_rejected() {
        let err = CompilerOptions::from_toml_str("[filter]\nin_separator = \"\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "filter.in_separator",
                ..
            }
        ));
    }

    #[test]
    fn reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[projection]\nroot_parameter = \"row\"").unwrap();
        let options = CompilerOptions::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(options.projection.root_parameter, "row");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CompilerOptions::load(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[filter\nin_separator = 1").unwrap();
        let err = CompilerOptions::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
