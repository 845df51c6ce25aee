//! Catalog transport: listing fetches and archive downloads.
//!
//! Provides a trait-based abstraction over the catalog so the resolution
//! and cascade logic can be exercised without network access. The
//! production implementation uses blocking `ureq` agents. Listings are
//! bounded by the configured timeout end to end; archive downloads only
//! bound the wait for a connection and response headers, so a slow but
//! live transfer of a large archive is never cut short.

use indicatif::ProgressDrawTarget;
use log::debug;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::progress::{ProgressMode, TransferProgress};

/// Trait for talking to the release catalog.
///
/// Abstractions allow tests to script listings and archives without
/// network access.
#[cfg_attr(test, mockall::automock)]
pub trait CatalogClient {
    /// Fetch the HTML directory listing at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not text.
    fn fetch_listing(&self, url: &str) -> Result<String, DownloadError>;

    /// Download the archive at `url` into `dest`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the file cannot be written.
    fn download(&self, url: &str, dest: &Path, progress: ProgressMode)
    -> Result<u64, DownloadError>;
}

/// Errors arising from catalog requests.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested file does not exist (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking HTTP client backed by `ureq` agents.
pub struct HttpCatalogClient {
    listing_agent: ureq::Agent,
    archive_agent: ureq::Agent,
}

impl HttpCatalogClient {
    /// Create a client that stops waiting on the server after `timeout`.
    ///
    /// A listing request must complete within `timeout`. An archive
    /// download must connect and receive its response headers within
    /// `timeout`; reading the body is not bounded.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let listing_config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let archive_config = ureq::Agent::config_builder()
            .timeout_resolve(Some(timeout))
            .timeout_connect(Some(timeout))
            .timeout_send_request(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .build();
        Self {
            listing_agent: ureq::Agent::new_with_config(listing_config),
            archive_agent: ureq::Agent::new_with_config(archive_config),
        }
    }
}

impl CatalogClient for HttpCatalogClient {
    fn fetch_listing(&self, url: &str) -> Result<String, DownloadError> {
        debug!("fetching listing {url}");
        let response = self
            .listing_agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }

    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: ProgressMode,
    ) -> Result<u64, DownloadError> {
        debug!("downloading {url} to {}", dest.display());
        let response = self
            .archive_agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut body = response.into_body();
        let total = body.content_length();
        let mut reader = body.as_reader();
        let file = std::fs::File::create(dest)?;

        match progress {
            ProgressMode::Report => {
                let tracker = TransferProgress::start(total, ProgressDrawTarget::stdout());
                let mut sink = tracker.wrap_write(file);
                match copy_body(url, &mut reader, &mut sink) {
                    Ok(written) => {
                        tracker.finish();
                        Ok(written)
                    }
                    Err(e) => {
                        tracker.abandon();
                        Err(e)
                    }
                }
            }
            ProgressMode::Silent => {
                let mut sink = file;
                copy_body(url, &mut reader, &mut sink)
            }
        }
    }
}

/// Stream the response body into `sink` and flush it.
fn copy_body(
    url: &str,
    reader: &mut dyn std::io::Read,
    sink: &mut dyn Write,
) -> Result<u64, DownloadError> {
    let written = std::io::copy(reader, sink).map_err(|e| DownloadError::HttpError {
        url: url.to_owned(),
        reason: format!("transfer interrupted: {e}"),
    })?;
    sink.flush()?;
    Ok(written)
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
