//! Two-level version resolution against the release catalog.
//!
//! The catalog root lists releases; each release lists builds. The newest
//! build of the newest release is the base every candidate URL hangs off.

use log::info;
use std::fmt;

use crate::download::{CatalogClient, DownloadError};
use crate::listing::DirectoryListingParser;
use crate::version::{VersionError, VersionToken, select_latest};

/// Root of the Fusion release catalog.
pub const CATALOG_ROOT: &str = "https://softwareupdate.vmware.com/cds/vmw-desktop/fusion/";

/// Errors arising from version resolution. Both variants abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A listing page could not be fetched.
    #[error("could not read catalog listing: {0}")]
    Listing(#[from] DownloadError),

    /// A listing page held no version tokens.
    #[error(transparent)]
    Version(#[from] VersionError),
}

/// The newest release and build, and the URL they resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePath {
    release: VersionToken,
    build: VersionToken,
    base_url: String,
}

impl ReleasePath {
    /// Return the selected release.
    #[must_use]
    pub fn release(&self) -> &VersionToken {
        &self.release
    }

    /// Return the selected build of that release.
    #[must_use]
    pub fn build(&self) -> &VersionToken {
        &self.build
    }

    /// Return `<root><release>/<build>/`, the base of every candidate URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Display for ReleasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} build {}", self.release, self.build)
    }
}

/// Resolve the newest build of the newest release below `root`.
///
/// The parser is cleared before each listing, so one instance serves both
/// levels.
///
/// # Errors
///
/// Returns [`ResolveError::Listing`] if a listing cannot be fetched and
/// [`ResolveError::Version`] if a listing contains no versions.
pub fn resolve_latest(
    client: &dyn CatalogClient,
    parser: &mut DirectoryListingParser,
    root: &str,
) -> Result<ReleasePath, ResolveError> {
    let release = latest_in_listing(client, parser, root)?;
    let release_url = format!("{root}{release}/");

    let build = latest_in_listing(client, parser, &release_url)?;
    let base_url = format!("{release_url}{build}/");
    info!("resolved latest release {release} build {build}");

    Ok(ReleasePath {
        release,
        build,
        base_url,
    })
}

fn latest_in_listing(
    client: &dyn CatalogClient,
    parser: &mut DirectoryListingParser,
    url: &str,
) -> Result<VersionToken, ResolveError> {
    let html = client.fetch_listing(url)?;
    parser.clear();
    parser.feed(&html);
    let latest = select_latest(parser.tokens(), url)?.clone();
    parser.clear();
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::MockCatalogClient;
    use crate::test_utils::listing_html;

    const ROOT: &str = "https://example.test/fusion/";

    #[test]
    fn resolves_newest_build_of_newest_release() {
        let mut client = MockCatalogClient::new();
        client
            .expect_fetch_listing()
            .withf(|url| url == ROOT)
            .times(1)
            .returning(|_| Ok(listing_html(&["12.2.5", "13.0.0", "13.0.1"])));
        client
            .expect_fetch_listing()
            .withf(|url| url == "https://example.test/fusion/13.0.1/")
            .times(1)
            .returning(|_| Ok(listing_html(&["21139760", "20486664"])));

        let mut parser = DirectoryListingParser::new();
        let path = resolve_latest(&client, &mut parser, ROOT).expect("resolved");

        assert_eq!(path.release().as_str(), "13.0.1");
        assert_eq!(path.build().as_str(), "21139760");
        assert_eq!(path.base_url(), "https://example.test/fusion/13.0.1/21139760/");
        assert!(parser.tokens().is_empty(), "parser is left clean");
    }

    #[test]
    fn empty_release_listing_is_no_version_found() {
        let mut client = MockCatalogClient::new();
        client
            .expect_fetch_listing()
            .times(1)
            .returning(|_| Ok("<html><body>Service unavailable</body></html>".to_owned()));

        let mut parser = DirectoryListingParser::new();
        let err = resolve_latest(&client, &mut parser, ROOT).expect_err("no versions");

        assert!(matches!(
            err,
            ResolveError::Version(VersionError::NoVersionFound { ref url }) if url == ROOT
        ));
    }

    #[test]
    fn empty_build_listing_is_no_version_found() {
        let mut client = MockCatalogClient::new();
        client
            .expect_fetch_listing()
            .withf(|url| url == ROOT)
            .returning(|_| Ok(listing_html(&["13.0.1"])));
        client
            .expect_fetch_listing()
            .withf(|url| url == "https://example.test/fusion/13.0.1/")
            .returning(|_| Ok(listing_html(&[])));

        let mut parser = DirectoryListingParser::new();
        let err = resolve_latest(&client, &mut parser, ROOT).expect_err("no builds");
        assert!(matches!(
            err,
            ResolveError::Version(VersionError::NoVersionFound { .. })
        ));
    }

    #[test]
    fn listing_fetch_failure_is_reported() {
        let mut client = MockCatalogClient::new();
        client.expect_fetch_listing().returning(|url| {
            Err(DownloadError::HttpError {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            })
        });

        let mut parser = DirectoryListingParser::new();
        let err = resolve_latest(&client, &mut parser, ROOT).expect_err("fetch fails");
        assert!(matches!(err, ResolveError::Listing(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn display_names_release_and_build() {
        let mut client = MockCatalogClient::new();
        client
            .expect_fetch_listing()
            .withf(|url| url == ROOT)
            .returning(|_| Ok(listing_html(&["13.0.1"])));
        client
            .expect_fetch_listing()
            .returning(|_| Ok(listing_html(&["21139760"])));

        let mut parser = DirectoryListingParser::new();
        let path = resolve_latest(&client, &mut parser, ROOT).expect("resolved");
        assert_eq!(path.to_string(), "13.0.1 build 21139760");
    }
}
