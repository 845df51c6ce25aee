//! One complete fetch run.
//!
//! Guard the destination, wipe it, resolve the newest build, then let the
//! cascade fill the destination. All capabilities are injected so the whole
//! flow runs against stubs in tests.

use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cascade::{AcquisitionCascade, AcquisitionOutcome, CascadeState};
use crate::catalog::resolve_latest;
use crate::download::CatalogClient;
use crate::error::Result;
use crate::guard::{Prompt, RefetchDecision, gate, recreate};
use crate::listing::DirectoryListingParser;
use crate::output::{TOOLS_NOT_FOUND, TRYING_PACKAGES, write_stdout_line};
use crate::unpack::ArchiveUnpacker;

/// Where a run reads from and writes to.
#[derive(Debug, Clone, Copy)]
pub struct FetchContext<'a> {
    /// Destination directory for the images.
    pub dest_dir: &'a Path,
    /// Catalog root listing the releases.
    pub catalog_root: &'a str,
}

/// How a run ended, when it did not fail outright.
#[derive(Debug)]
pub enum RunOutcome {
    /// The images were present and the user chose to keep them.
    KeptExisting,
    /// The images were fetched into the destination.
    Retrieved {
        /// The strategy that produced them.
        state: CascadeState,
        /// Files written to the destination.
        paths: Vec<PathBuf>,
    },
    /// No candidate location had the images.
    NotFound {
        /// Why the last candidate failed.
        reason: String,
    },
}

/// Run the whole fetch against the given capabilities.
///
/// Narration goes to `out`; the prompt is only consulted when the
/// destination already holds both images.
///
/// # Errors
///
/// Returns an error if the prompt fails, the destination cannot be
/// recreated or written, or the catalog listings cannot be resolved. A
/// cascade that finds nothing is not an error; it yields
/// [`RunOutcome::NotFound`].
pub fn run_fetch(
    context: &FetchContext<'_>,
    client: &dyn CatalogClient,
    unpacker: &dyn ArchiveUnpacker,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<RunOutcome> {
    if gate(context.dest_dir, prompt, out)? == RefetchDecision::KeepExisting {
        info!("keeping existing images in {}", context.dest_dir.display());
        return Ok(RunOutcome::KeptExisting);
    }

    recreate(context.dest_dir)?;
    write_stdout_line(out, TRYING_PACKAGES);

    let mut parser = DirectoryListingParser::new();
    let release = resolve_latest(client, &mut parser, context.catalog_root)?;
    info!("fetching tools for {release}");

    let cascade = AcquisitionCascade::new(client, unpacker, release.base_url(), context.dest_dir);
    match cascade.run(out)? {
        AcquisitionOutcome::Success { state, paths } => Ok(RunOutcome::Retrieved { state, paths }),
        AcquisitionOutcome::Failure { reason } => {
            write_stdout_line(out, TOOLS_NOT_FOUND);
            Ok(RunOutcome::NotFound { reason })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::PackageImage;
    use crate::error::FetcherError;
    use crate::guard::{GuardError, MockPrompt};
    use crate::test_utils::{ScriptedPrompt, StubCatalog, dir_entries, package_archive};
    use crate::unpack::TarZipUnpacker;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const ROOT: &str = "https://example.test/fusion/";

    #[fixture]
    fn work_dir() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn published_catalog() -> StubCatalog {
        let base = format!("{ROOT}13.0.1/21139760/packages/");
        PackageImage::ALL.into_iter().fold(
            StubCatalog::new()
                .with_listing(ROOT, &["13.0.0", "13.0.1"])
                .with_listing(format!("{ROOT}13.0.1/"), &["20486664", "21139760"]),
            |catalog, image| {
                catalog.with_archive(
                    format!("{base}com.vmware.fusion.tools.{}.zip.tar", image.stem()),
                    package_archive(image).expect("build package archive"),
                )
            },
        )
    }

    fn place_images(dest: &Path) {
        std::fs::create_dir_all(dest).expect("create tools");
        std::fs::write(dest.join("darwin.iso"), b"old").expect("write");
        std::fs::write(dest.join("darwinPre15.iso"), b"old").expect("write");
    }

    #[rstest]
    fn fresh_run_fetches_from_newest_build(work_dir: TempDir) {
        let dest = work_dir.path().join("tools");
        let catalog = published_catalog();
        let mut prompt = MockPrompt::new();
        prompt.expect_ask().never();
        let mut out = Vec::new();

        let outcome = run_fetch(
            &FetchContext {
                dest_dir: &dest,
                catalog_root: ROOT,
            },
            &catalog,
            &TarZipUnpacker,
            &mut prompt,
            &mut out,
        )
        .expect("run succeeds");

        assert!(matches!(
            outcome,
            RunOutcome::Retrieved {
                state: CascadeState::PackageArtifact,
                ..
            }
        ));
        assert_eq!(
            catalog.listing_requests(),
            vec![ROOT.to_owned(), format!("{ROOT}13.0.1/")]
        );
        assert!(
            dir_entries(&dest)
                .expect("list directory")
                .contains(&"darwin.iso".to_owned())
        );
        let narration = String::from_utf8(out).expect("utf-8");
        assert!(narration.starts_with("Trying to get tools from the packages folder...\n"));
    }

    #[rstest]
    fn declining_keeps_destination_untouched(work_dir: TempDir) {
        let dest = work_dir.path().join("tools");
        place_images(&dest);
        let catalog = StubCatalog::new();
        let mut prompt = ScriptedPrompt::new(["n"]);
        let mut out = Vec::new();

        let outcome = run_fetch(
            &FetchContext {
                dest_dir: &dest,
                catalog_root: ROOT,
            },
            &catalog,
            &TarZipUnpacker,
            &mut prompt,
            &mut out,
        )
        .expect("run succeeds");

        assert!(matches!(outcome, RunOutcome::KeptExisting));
        assert!(catalog.listing_requests().is_empty());
        assert_eq!(std::fs::read(dest.join("darwin.iso")).expect("read"), b"old");
    }

    #[rstest]
    fn closed_input_stops_before_wiping(work_dir: TempDir) {
        let dest = work_dir.path().join("tools");
        place_images(&dest);
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let mut out = Vec::new();

        let err = run_fetch(
            &FetchContext {
                dest_dir: &dest,
                catalog_root: ROOT,
            },
            &StubCatalog::new(),
            &TarZipUnpacker,
            &mut prompt,
            &mut out,
        )
        .expect_err("no answer");

        assert!(matches!(err, FetcherError::Guard(GuardError::InputClosed)));
        assert!(dest.join("darwinPre15.iso").is_file());
    }

    #[rstest]
    fn unreachable_catalog_is_resolve_error(work_dir: TempDir) {
        let dest = work_dir.path().join("tools");
        let catalog = StubCatalog::new();
        catalog.fail_listings();
        let mut prompt = ScriptedPrompt::default();
        let mut out = Vec::new();

        let err = run_fetch(
            &FetchContext {
                dest_dir: &dest,
                catalog_root: ROOT,
            },
            &catalog,
            &TarZipUnpacker,
            &mut prompt,
            &mut out,
        )
        .expect_err("listing fails");

        assert!(matches!(err, FetcherError::Resolve(_)));
        assert!(!err.is_fatal());
        assert!(dest.is_dir(), "destination was recreated before resolving");
    }

    #[rstest]
    fn empty_catalog_reports_tools_not_found(work_dir: TempDir) {
        let dest = work_dir.path().join("tools");
        let catalog = StubCatalog::new()
            .with_listing(ROOT, &["13.0.1"])
            .with_listing(format!("{ROOT}13.0.1/"), &["21139760"]);
        let mut prompt = ScriptedPrompt::default();
        let mut out = Vec::new();

        let outcome = run_fetch(
            &FetchContext {
                dest_dir: &dest,
                catalog_root: ROOT,
            },
            &catalog,
            &TarZipUnpacker,
            &mut prompt,
            &mut out,
        )
        .expect("exhaustion is not an error");

        assert!(matches!(outcome, RunOutcome::NotFound { .. }));
        assert!(dir_entries(&dest).expect("list directory").is_empty());
        let narration = String::from_utf8(out).expect("utf-8");
        assert!(narration.ends_with("Couldn't find tools\n"));
    }
}
