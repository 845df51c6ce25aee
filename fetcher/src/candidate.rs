//! Candidate source locations for the tool images.
//!
//! Each release places the images differently. A [`CandidateSource`] names
//! one location: the archive URL, the nested archive inside its container,
//! the payload files to pull out, and how their internal paths are rewritten
//! to flat destination names.

use crate::unpack::NestedEntry;

/// Flat file name of the current tool image.
pub const DARWIN_ISO: &str = "darwin.iso";

/// Flat file name of the legacy tool image.
pub const DARWIN_PRE15_ISO: &str = "darwinPre15.iso";

/// Both images a successful run must leave in the destination.
pub const REQUIRED_IMAGES: [&str; 2] = [DARWIN_ISO, DARWIN_PRE15_ISO];

/// Container archive name of the core bundle.
pub const CORE_ARCHIVE: &str = "com.vmware.fusion.zip.tar";

/// Nested archive held by the core bundle container.
pub const CORE_MEMBER: &str = "com.vmware.fusion.zip";

/// Image directory inside the core bundle used by older releases.
pub const ISO_IMAGES_PREFIX: &str = "payload/VMware Fusion.app/Contents/Library/isoimages/";

/// Architecture-specific image directory inside newer core bundles.
pub const X86_ISO_IMAGES_PREFIX: &str =
    "payload/VMware Fusion.app/Contents/Library/isoimages/x86_x64/";

/// Prefix of payload files inside package archives.
const PACKAGE_PAYLOAD_PREFIX: &str = "payload/";

/// One of the two per-image package archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageImage {
    /// `com.vmware.fusion.tools.darwin.zip.tar`.
    Darwin,
    /// `com.vmware.fusion.tools.darwinPre15.zip.tar`.
    DarwinPre15,
}

impl PackageImage {
    /// Both package images in retrieval order.
    pub const ALL: [Self; 2] = [Self::Darwin, Self::DarwinPre15];

    /// Return the image stem used in archive and payload names.
    #[must_use]
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::DarwinPre15 => "darwinPre15",
        }
    }

    /// Return the label used in progress messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Darwin => "Darwin",
            Self::DarwinPre15 => "DarwinPre15",
        }
    }
}

/// Where a release keeps its core bundle, relative to the build URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreBundleLocation {
    /// `core/`, the bundle carrying every architecture.
    Universal,
    /// `x86/core/`, one level deeper under the x86 directory.
    X86,
    /// `universal/core/`, the layout used by older releases.
    Generic,
}

impl CoreBundleLocation {
    /// Return the path segment substituted for `packages` in the build URL.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Universal => "core",
            Self::X86 => "x86/core",
            Self::Generic => "universal/core",
        }
    }
}

/// How payload paths inside the nested archive map to flat names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRewrite {
    /// Every payload sits directly under a fixed prefix.
    FixedPrefix(&'static str),
    /// Payloads sit under [`X86_ISO_IMAGES_PREFIX`] when the archive has
    /// that directory entry, otherwise under [`ISO_IMAGES_PREFIX`].
    ProbeIsoImages,
}

impl PathRewrite {
    /// Resolve the prefix, calling `has_entry` to probe the archive when the
    /// layout varies.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by `has_entry`.
    pub fn resolve_prefix<E>(
        self,
        has_entry: impl FnOnce(&str) -> Result<bool, E>,
    ) -> Result<&'static str, E> {
        match self {
            Self::FixedPrefix(prefix) => Ok(prefix),
            Self::ProbeIsoImages => {
                if has_entry(X86_ISO_IMAGES_PREFIX)? {
                    Ok(X86_ISO_IMAGES_PREFIX)
                } else {
                    Ok(ISO_IMAGES_PREFIX)
                }
            }
        }
    }
}

/// A single location the images might be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSource {
    archive_url: String,
    archive_name: String,
    container_member: String,
    payload_names: Vec<String>,
    rewrite: PathRewrite,
}

impl CandidateSource {
    /// Build the package-archive candidate for one image below `base_url`.
    ///
    /// The nested archive yields the image and its signature file.
    ///
    /// # Examples
    ///
    /// ```
    /// use darwin_tools_fetcher::candidate::{CandidateSource, PackageImage};
    ///
    /// let source = CandidateSource::package("https://example.test/13.0.1/21139760/", PackageImage::Darwin);
    /// assert_eq!(
    ///     source.archive_url(),
    ///     "https://example.test/13.0.1/21139760/packages/com.vmware.fusion.tools.darwin.zip.tar"
    /// );
    /// assert_eq!(source.container_member(), "com.vmware.fusion.tools.darwin.zip");
    /// ```
    #[must_use]
    pub fn package(base_url: &str, image: PackageImage) -> Self {
        let stem = image.stem();
        let container_member = format!("com.vmware.fusion.tools.{stem}.zip");
        let archive_name = format!("{container_member}.tar");
        Self {
            archive_url: format!("{base_url}packages/{archive_name}"),
            archive_name,
            container_member,
            payload_names: vec![format!("{stem}.iso"), format!("{stem}.iso.sig")],
            rewrite: PathRewrite::FixedPrefix(PACKAGE_PAYLOAD_PREFIX),
        }
    }

    /// Build the core-bundle candidate at `location` below `base_url`.
    ///
    /// Core bundles carry both images but no signature files.
    #[must_use]
    pub fn core_bundle(base_url: &str, location: CoreBundleLocation) -> Self {
        Self {
            archive_url: format!("{base_url}{}/{CORE_ARCHIVE}", location.path_segment()),
            archive_name: CORE_ARCHIVE.to_owned(),
            container_member: CORE_MEMBER.to_owned(),
            payload_names: REQUIRED_IMAGES.iter().map(|&name| name.to_owned()).collect(),
            rewrite: PathRewrite::ProbeIsoImages,
        }
    }

    /// Return the URL of the container archive.
    #[must_use]
    pub fn archive_url(&self) -> &str {
        &self.archive_url
    }

    /// Return the local file name for the downloaded container.
    #[must_use]
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// Return the nested archive name inside the container.
    #[must_use]
    pub fn container_member(&self) -> &str {
        &self.container_member
    }

    /// Return the flat names of the payload files.
    #[must_use]
    pub fn payload_names(&self) -> &[String] {
        &self.payload_names
    }

    /// Return the path rewrite rule.
    #[must_use]
    pub const fn rewrite(&self) -> PathRewrite {
        self.rewrite
    }

    /// Pair every payload name with its internal path under `prefix`.
    #[must_use]
    pub fn entries_under(&self, prefix: &str) -> Vec<NestedEntry> {
        self.payload_names
            .iter()
            .map(|name| NestedEntry::new(format!("{prefix}{name}"), name.clone()))
            .collect()
    }
}
