//! Run configuration.
//!
//! The destination is always `tools/` under the working directory. The HTTP
//! timeout starts from a built-in default, may be set in an optional
//! `gettools.toml` next to the destination, and may be overridden by the
//! `GETTOOLS_TIMEOUT_SECS` environment variable.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Name of the destination directory created under the working directory.
pub const TOOLS_DIR: &str = "tools";

/// Name of the optional configuration file in the working directory.
pub const CONFIG_FILE: &str = "gettools.toml";

/// Environment variable overriding the HTTP timeout, in seconds.
pub const TIMEOUT_ENV: &str = "GETTOOLS_TIMEOUT_SECS";

/// Timeout applied when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Errors arising while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("could not read {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid {path}: {reason}")]
    Parse {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// A timeout value is zero or not a whole number of seconds.
    #[error("invalid timeout {value:?} from {source_name}; expected a positive number of seconds")]
    InvalidTimeout {
        /// Where the value came from (file path or variable name).
        source_name: String,
        /// The rejected value.
        value: String,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    download: DownloadSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DownloadSection {
    timeout_secs: Option<u64>,
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Directory the images are written to.
    pub dest_dir: Utf8PathBuf,
    /// Limit on waiting for the catalog: whole listing requests, and the
    /// connection and response headers of archive downloads.
    pub timeout: Duration,
}

impl FetcherConfig {
    /// Load configuration for a run in `work_dir`, reading the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration file is unreadable or
    /// invalid, or a timeout value is rejected.
    pub fn load(work_dir: &Utf8Path) -> Result<Self, ConfigError> {
        Self::load_with(work_dir, |key| std::env::var(key).ok())
    }

    /// Load configuration using `env` to look up environment variables.
    ///
    /// # Errors
    ///
    /// As for [`Self::load`].
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use darwin_tools_fetcher::config::FetcherConfig;
    /// use std::time::Duration;
    ///
    /// let config = FetcherConfig::load_with(Utf8Path::new("/nonexistent"), |_| Some("45".to_owned()))
    ///     .expect("valid override");
    /// assert_eq!(config.timeout, Duration::from_secs(45));
    /// assert_eq!(config.dest_dir, "/nonexistent/tools");
    /// ```
    pub fn load_with<F>(work_dir: &Utf8Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut timeout_secs = DEFAULT_TIMEOUT_SECS;

        let path = work_dir.join(CONFIG_FILE);
        if let Some(secs) = read_file_config(&path)?.and_then(|file| file.download.timeout_secs) {
            timeout_secs = positive(secs, path.as_str())?;
        }

        if let Some(raw) = env(TIMEOUT_ENV) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                let secs = trimmed.parse::<u64>().map_err(|_| invalid(TIMEOUT_ENV, trimmed))?;
                timeout_secs = positive(secs, TIMEOUT_ENV)?;
            }
        }

        debug!("using HTTP timeout of {timeout_secs}s");
        Ok(Self {
            dest_dir: work_dir.join(TOOLS_DIR),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn read_file_config(path: &Utf8Path) -> Result<Option<FileConfig>, ConfigError> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            });
        }
    };
    debug!("reading configuration from {path}");
    toml::from_str(&source)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            reason: e.message().to_owned(),
        })
}

fn positive(secs: u64, source_name: &str) -> Result<u64, ConfigError> {
    if secs == 0 {
        return Err(invalid(source_name, "0"));
    }
    Ok(secs)
}

fn invalid(source_name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidTimeout {
        source_name: source_name.to_owned(),
        value: value.to_owned(),
    }
}
