//! Error types for the `gettools` run.
//!
//! Each concern owns its own error enum; [`FetcherError`] gathers them so
//! the binary can decide the exit status in one place.

use thiserror::Error;

use crate::cascade::CascadeError;
use crate::catalog::ResolveError;
use crate::config::ConfigError;
use crate::guard::GuardError;

/// Errors that stop a fetch run.
#[derive(Debug, Error)]
pub enum FetcherError {
    /// The working directory is unusable as a base for the destination.
    #[error("cannot run here: {reason}")]
    PreconditionUnmet {
        /// Description of what is wrong with the environment.
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The latest release or build could not be determined.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The re-fetch confirmation failed.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The destination directory could not be written.
    #[error(transparent)]
    Destination(#[from] CascadeError),

    /// An I/O operation on the destination failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetcherError {
    /// Return whether the error happened before any network activity and
    /// should fail the process.
    ///
    /// Failures once the run is under way are reported but the process
    /// still exits successfully.
    ///
    /// # Examples
    ///
    /// ```
    /// use darwin_tools_fetcher::error::FetcherError;
    ///
    /// let err = FetcherError::PreconditionUnmet { reason: "no cwd".to_owned() };
    /// assert!(err.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::PreconditionUnmet { .. } | Self::Config(_))
    }
}

/// Result type alias using [`FetcherError`].
pub type Result<T> = std::result::Result<T, FetcherError>;
