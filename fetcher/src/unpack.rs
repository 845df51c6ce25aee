//! Two-stage archive unpacking for catalog downloads.
//!
//! Catalog archives are a `tar` container wrapping a single `zip`. The
//! container is read sequentially to pull out the one nested archive; the
//! nested archive is then opened for random access so individual payload
//! entries can be extracted and flattened into a destination directory.
//! Every write is checked so nothing lands outside the destination.

use log::debug;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

/// A payload entry to pull out of a nested archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedEntry {
    /// Path of the entry inside the nested archive.
    pub internal_path: String,
    /// Flat file name to write in the destination directory.
    pub dest_name: String,
}

impl NestedEntry {
    /// Pair an internal archive path with its flattened destination name.
    #[must_use]
    pub fn new(internal_path: impl Into<String>, dest_name: impl Into<String>) -> Self {
        Self {
            internal_path: internal_path.into(),
            dest_name: dest_name.into(),
        }
    }
}

/// Trait for unpacking container and nested archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveUnpacker {
    /// Extract the single member named `member` from the container archive.
    ///
    /// Returns the path the member was written to inside `dest_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError::MemberNotFound`] if the container has no such
    /// member, [`UnpackError::PathTraversal`] if the member name would escape
    /// `dest_dir`, and [`UnpackError::Io`] on read or write failures.
    fn unpack_container(
        &self,
        container: &Path,
        member: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, UnpackError>;

    /// Report whether the nested archive holds an entry named exactly
    /// `internal_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the nested archive cannot be opened.
    fn contains_entry(&self, nested: &Path, internal_path: &str) -> Result<bool, UnpackError>;

    /// Extract each entry from the nested archive into `dest_dir` under its
    /// flat destination name.
    ///
    /// Extraction stops at the first missing entry; files already written by
    /// this call are left for the caller to clean up.
    ///
    /// # Errors
    ///
    /// Returns [`UnpackError::EntryNotFound`] for a missing entry,
    /// [`UnpackError::PathTraversal`] when an entry or destination name would
    /// resolve outside `dest_dir`, and [`UnpackError::Io`] or
    /// [`UnpackError::Zip`] on read or write failures.
    fn unpack_nested(
        &self,
        nested: &Path,
        entries: &[NestedEntry],
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, UnpackError>;
}

/// Errors arising from archive unpacking.
#[derive(Debug, thiserror::Error)]
pub enum UnpackError {
    /// I/O error while reading an archive or writing an entry.
    #[error("unpack I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The nested archive could not be read.
    #[error("nested archive is unreadable: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The container archive has no member with the requested name.
    #[error("member {member} not found in {}", container.display())]
    MemberNotFound {
        /// The member that was requested.
        member: String,
        /// The container that was searched.
        container: PathBuf,
    },

    /// The nested archive has no entry with the requested path.
    #[error("entry {entry} not found in {}", archive.display())]
    EntryNotFound {
        /// The entry that was requested.
        entry: String,
        /// The nested archive that was searched.
        archive: PathBuf,
    },

    /// A path would resolve outside the destination directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path.
        path: String,
    },
}

/// Default unpacker using the `tar` and `zip` crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarZipUnpacker;

impl ArchiveUnpacker for TarZipUnpacker {
    fn unpack_container(
        &self,
        container: &Path,
        member: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, UnpackError> {
        let wanted = Path::new(member);
        validate_relative_path(wanted)?;

        let file = File::open(container)?;
        let mut archive = tar::Archive::new(file);

        for entry_result in archive.entries()? {
            let mut entry = entry_result?;
            let entry_path = entry.path()?.into_owned();
            if !same_member(&entry_path, wanted) {
                continue;
            }

            let dest_path = dest_dir.join(wanted);
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            entry.unpack(&dest_path)?;
            debug!("extracted {member} from {}", container.display());
            return Ok(dest_path);
        }

        Err(UnpackError::MemberNotFound {
            member: member.to_owned(),
            container: container.to_path_buf(),
        })
    }

    fn contains_entry(&self, nested: &Path, internal_path: &str) -> Result<bool, UnpackError> {
        let archive = zip::ZipArchive::new(File::open(nested)?)?;
        let found = archive.file_names().any(|name| name == internal_path);
        Ok(found)
    }

    fn unpack_nested(
        &self,
        nested: &Path,
        entries: &[NestedEntry],
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, UnpackError> {
        let mut archive = zip::ZipArchive::new(File::open(nested)?)?;
        let mut written = Vec::with_capacity(entries.len());

        for entry in entries {
            validate_relative_path(Path::new(&entry.internal_path))?;
            validate_flat_name(&entry.dest_name)?;

            let mut source = match archive.by_name(&entry.internal_path) {
                Ok(source) => source,
                Err(zip::result::ZipError::FileNotFound) => {
                    return Err(UnpackError::EntryNotFound {
                        entry: entry.internal_path.clone(),
                        archive: nested.to_path_buf(),
                    });
                }
                Err(other) => return Err(other.into()),
            };
            if source.enclosed_name().is_none() {
                return Err(UnpackError::PathTraversal {
                    path: entry.internal_path.clone(),
                });
            }

            let dest_path = dest_dir.join(&entry.dest_name);
            let mut out = File::create(&dest_path)?;
            std::io::copy(&mut source, &mut out)?;
            debug!(
                "extracted {} from {} as {}",
                entry.internal_path,
                nested.display(),
                entry.dest_name
            );
            written.push(dest_path);
        }

        Ok(written)
    }
}

/// Compare a tar entry path with the requested member, ignoring `./`.
fn same_member(entry_path: &Path, wanted: &Path) -> bool {
    significant_components(entry_path).eq(significant_components(wanted))
}

fn significant_components(path: &Path) -> impl Iterator<Item = Component<'_>> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
}

/// Validate that an archive path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_relative_path(path: &Path) -> Result<(), UnpackError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(UnpackError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Validate that a destination name is a single plain file name.
fn validate_flat_name(name: &str) -> Result<(), UnpackError> {
    let mut components = Path::new(name).components();
    let is_flat = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !is_flat {
        return Err(UnpackError::PathTraversal {
            path: name.to_owned(),
        });
    }
    Ok(())
}
