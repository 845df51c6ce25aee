//! The acquisition cascade.
//!
//! Releases ship the tool images in different places. The cascade tries
//! each known location once, in a fixed order, and stops at the first one
//! that yields both images. Every attempt works inside a private staging
//! directory under the destination; the staged payloads are only moved into
//! the destination after the attempt has fully succeeded, so a failed
//! attempt leaves nothing behind.

use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::candidate::{CandidateSource, CoreBundleLocation, PackageImage};
use crate::download::{CatalogClient, DownloadError};
use crate::output::{
    CORE_SUCCESS, PACKAGE_SUCCESS, extracting_message, fallback_message, retrieving_message,
    write_stdout_line,
};
use crate::progress::ProgressMode;
use crate::unpack::{ArchiveUnpacker, UnpackError};

const STAGING_PREFIX: &str = ".staging-";

/// Position in the ordered list of acquisition strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    /// Per-image package archives under `packages/`.
    PackageArtifact,
    /// Core bundle under `core/`.
    CoreBundleUniversalArch,
    /// Core bundle under `x86/core/`.
    CoreBundleX86Arch,
    /// Core bundle under `universal/core/`.
    CoreBundleGenericArch,
    /// Every strategy has failed.
    Exhausted,
}

impl CascadeState {
    /// The state every run starts in.
    pub const INITIAL: Self = Self::PackageArtifact;

    /// Return the state tried after this one fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use darwin_tools_fetcher::cascade::CascadeState;
    ///
    /// let mut state = CascadeState::INITIAL;
    /// let mut visited = 1;
    /// while state != CascadeState::Exhausted {
    ///     state = state.next();
    ///     visited += 1;
    /// }
    /// assert_eq!(visited, 5);
    /// assert_eq!(state.next(), CascadeState::Exhausted);
    /// ```
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::PackageArtifact => Self::CoreBundleUniversalArch,
            Self::CoreBundleUniversalArch => Self::CoreBundleX86Arch,
            Self::CoreBundleX86Arch => Self::CoreBundleGenericArch,
            Self::CoreBundleGenericArch | Self::Exhausted => Self::Exhausted,
        }
    }

    /// Return the core bundle location this state fetches, if any.
    #[must_use]
    pub const fn core_location(self) -> Option<CoreBundleLocation> {
        match self {
            Self::CoreBundleUniversalArch => Some(CoreBundleLocation::Universal),
            Self::CoreBundleX86Arch => Some(CoreBundleLocation::X86),
            Self::CoreBundleGenericArch => Some(CoreBundleLocation::Generic),
            Self::PackageArtifact | Self::Exhausted => None,
        }
    }
}

/// Result of running the cascade to completion.
///
/// Candidate failures are expected and never surface as errors; only a
/// destination that cannot be written aborts the cascade early.
#[derive(Debug)]
pub enum AcquisitionOutcome {
    /// A strategy produced every payload file.
    Success {
        /// The strategy that succeeded.
        state: CascadeState,
        /// Payload files now present in the destination.
        paths: Vec<PathBuf>,
    },
    /// Every strategy failed.
    Failure {
        /// Why the last strategy failed.
        reason: String,
    },
}

/// Failures that stop the cascade without trying further strategies.
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    /// A staging directory could not be created in the destination.
    #[error("could not create a staging directory in {}: {source}", dest_dir.display())]
    Staging {
        /// The destination directory.
        dest_dir: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A staged payload could not be moved into the destination.
    #[error("could not move {name} into {}: {source}", dest_dir.display())]
    Commit {
        /// Flat name of the payload file.
        name: String,
        /// The destination directory.
        dest_dir: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Why a single attempt failed.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Unpack(#[from] UnpackError),

    #[error(transparent)]
    Destination(#[from] CascadeError),
}

/// Tagged result of one cascade step.
#[derive(Debug)]
enum StepResult {
    Acquired(Vec<PathBuf>),
    Advance(String),
    FatalAbort(CascadeError),
}

impl From<Result<Vec<PathBuf>, AttemptError>> for StepResult {
    fn from(result: Result<Vec<PathBuf>, AttemptError>) -> Self {
        match result {
            Ok(paths) => Self::Acquired(paths),
            Err(AttemptError::Destination(err)) => Self::FatalAbort(err),
            Err(other) => Self::Advance(other.to_string()),
        }
    }
}

/// Drives the strategies for one resolved build.
pub struct AcquisitionCascade<'a> {
    client: &'a dyn CatalogClient,
    unpacker: &'a dyn ArchiveUnpacker,
    base_url: &'a str,
    dest_dir: &'a Path,
}

impl<'a> AcquisitionCascade<'a> {
    /// Create a cascade fetching below `base_url` into `dest_dir`.
    ///
    /// `dest_dir` must already exist; staging directories are created
    /// inside it.
    #[must_use]
    pub fn new(
        client: &'a dyn CatalogClient,
        unpacker: &'a dyn ArchiveUnpacker,
        base_url: &'a str,
        dest_dir: &'a Path,
    ) -> Self {
        Self {
            client,
            unpacker,
            base_url,
            dest_dir,
        }
    }

    /// Try every strategy in order until one succeeds or all have failed.
    ///
    /// Progress narration is written to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError`] when the destination itself cannot be
    /// written. Candidate failures are reported through
    /// [`AcquisitionOutcome::Failure`] instead.
    pub fn run(&self, out: &mut dyn Write) -> Result<AcquisitionOutcome, CascadeError> {
        let mut state = CascadeState::INITIAL;
        let mut last_reason = String::from("no strategy was attempted");

        loop {
            let step = if state == CascadeState::PackageArtifact {
                self.package_step(out)
            } else if let Some(location) = state.core_location() {
                self.core_step(location, out)
            } else {
                warn!("all candidate locations exhausted");
                return Ok(AcquisitionOutcome::Failure {
                    reason: last_reason,
                });
            };

            match step {
                StepResult::Acquired(paths) => {
                    info!("acquired {} payload files via {state:?}", paths.len());
                    return Ok(AcquisitionOutcome::Success { state, paths });
                }
                StepResult::Advance(reason) => {
                    debug!("{state:?} failed: {reason}");
                    state = state.next();
                    if let Some(next) = state.core_location() {
                        write_stdout_line(out, fallback_message(next));
                    }
                    last_reason = reason;
                }
                StepResult::FatalAbort(err) => return Err(err),
            }
        }
    }

    fn package_step(&self, out: &mut dyn Write) -> StepResult {
        self.fetch_packages(out).into()
    }

    fn core_step(&self, location: CoreBundleLocation, out: &mut dyn Write) -> StepResult {
        self.fetch_core_bundle(location, out).into()
    }

    /// Fetch both package archives; either failing discards both.
    fn fetch_packages(&self, out: &mut dyn Write) -> Result<Vec<PathBuf>, AttemptError> {
        let staging = self.staging()?;
        let mut staged = Vec::new();

        for (index, image) in PackageImage::ALL.into_iter().enumerate() {
            let source = CandidateSource::package(self.base_url, image);
            write_stdout_line(out, retrieving_message(image.label(), source.archive_url()));
            let progress = if index == 0 {
                ProgressMode::Report
            } else {
                ProgressMode::Silent
            };
            staged.extend(self.retrieve(&source, progress, staging.path(), out)?);
        }

        let committed = self.commit(staging, &staged)?;
        write_stdout_line(out, PACKAGE_SUCCESS);
        Ok(committed)
    }

    fn fetch_core_bundle(
        &self,
        location: CoreBundleLocation,
        out: &mut dyn Write,
    ) -> Result<Vec<PathBuf>, AttemptError> {
        let source = CandidateSource::core_bundle(self.base_url, location);
        write_stdout_line(
            out,
            retrieving_message(PackageImage::Darwin.label(), source.archive_url()),
        );
        let staging = self.staging()?;
        let staged = self.retrieve(&source, ProgressMode::Silent, staging.path(), out)?;

        let committed = self.commit(staging, &staged)?;
        write_stdout_line(out, CORE_SUCCESS);
        Ok(committed)
    }

    /// Download one candidate and unpack its payloads flat into `staging`.
    ///
    /// Returns the flat names of the staged payload files.
    fn retrieve(
        &self,
        source: &CandidateSource,
        progress: ProgressMode,
        staging: &Path,
        out: &mut dyn Write,
    ) -> Result<Vec<String>, AttemptError> {
        let archive = staging.join(source.archive_name());
        let bytes = self
            .client
            .download(source.archive_url(), &archive, progress)?;
        debug!("downloaded {bytes} bytes from {}", source.archive_url());

        write_stdout_line(out, extracting_message(source.archive_name()));
        let nested = self
            .unpacker
            .unpack_container(&archive, source.container_member(), staging)?;

        let nested_label = format!("files from {}", source.container_member());
        write_stdout_line(out, extracting_message(&nested_label));
        let prefix = source
            .rewrite()
            .resolve_prefix(|entry| self.unpacker.contains_entry(&nested, entry))?;
        let written = self
            .unpacker
            .unpack_nested(&nested, &source.entries_under(prefix), staging)?;
        debug!("staged {} payload files from {prefix}", written.len());

        discard_intermediate(&archive);
        discard_intermediate(&nested);
        Ok(source.payload_names().to_vec())
    }

    fn staging(&self) -> Result<TempDir, CascadeError> {
        tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(self.dest_dir)
            .map_err(|source| CascadeError::Staging {
                dest_dir: self.dest_dir.to_path_buf(),
                source,
            })
    }

    /// Move staged payloads into the destination and drop the staging area.
    ///
    /// A failed move takes back the files already moved, so the destination
    /// never holds part of an attempt.
    fn commit(&self, staging: TempDir, names: &[String]) -> Result<Vec<PathBuf>, CascadeError> {
        let mut committed: Vec<PathBuf> = Vec::with_capacity(names.len());

        for name in names {
            let target = self.dest_dir.join(name);
            if let Err(source) = std::fs::rename(staging.path().join(name), &target) {
                for moved in &committed {
                    discard_intermediate(moved);
                }
                return Err(CascadeError::Commit {
                    name: name.clone(),
                    dest_dir: self.dest_dir.to_path_buf(),
                    source,
                });
            }
            committed.push(target);
        }

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            warn!(
                "could not remove staging directory {}: {e}",
                staging_path.display()
            );
        }
        Ok(committed)
    }
}

/// Remove a file that is no longer needed; failures are only logged.
fn discard_intermediate(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!("could not remove {}: {e}", path.display());
    }
}

#[cfg(test)]
#[path = "cascade_tests.rs"]
mod tests;
