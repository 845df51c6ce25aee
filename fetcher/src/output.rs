//! User-facing narration for a fetch run.
//!
//! Messages go to injected writers rather than straight to the process
//! streams so the orchestration can be tested against in-memory buffers.

use std::fmt::Display;
use std::io::Write;

use crate::candidate::{CORE_ARCHIVE, CoreBundleLocation};

/// Printed before version resolution begins.
pub const TRYING_PACKAGES: &str = "Trying to get tools from the packages folder...";

/// Printed once both package archives have been unpacked.
pub const PACKAGE_SUCCESS: &str = "Tools from package retrieved successfully";

/// Printed once a core bundle has yielded both images.
pub const CORE_SUCCESS: &str = "Tools from core retrieved successfully";

/// Printed when every candidate location has failed.
pub const TOOLS_NOT_FOUND: &str = "Couldn't find tools";

/// Write one line to standard output, ignoring write failures.
pub fn write_stdout_line(stdout: &mut dyn Write, message: impl Display) {
    if writeln!(stdout, "{message}").is_err() {
        // Narration is best effort.
    }
}

/// Write one line to standard error, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Announce the download of `url` for the image labelled `label`.
#[must_use]
pub fn retrieving_message(label: &str, url: &str) -> String {
    format!("Retrieving {label} tools from: {url}")
}

/// Announce that the previous location failed and `next` is being tried.
///
/// # Examples
///
/// ```
/// use darwin_tools_fetcher::candidate::CoreBundleLocation;
/// use darwin_tools_fetcher::output::fallback_message;
///
/// let text = fallback_message(CoreBundleLocation::X86);
/// assert!(text.starts_with("Tools aren't here..."));
/// assert!(text.contains("x86/core/com.vmware.fusion.zip.tar"));
/// ```
#[must_use]
pub fn fallback_message(next: CoreBundleLocation) -> String {
    format!(
        "Tools aren't here... Be patient while I download and give a look into the {}/{CORE_ARCHIVE} file",
        next.path_segment()
    )
}

/// Announce extraction of `archive`.
#[must_use]
pub fn extracting_message(archive: &str) -> String {
    format!("Extracting {archive}...")
}
