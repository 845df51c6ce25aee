//! Shared test utilities for the fetcher crate.
//!
//! Archive fixtures are built in memory so tests never touch the network,
//! and the stubs stand in for the catalog and the interactive prompt.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor, Write};
use std::path::Path;

use crate::candidate::{CORE_MEMBER, DARWIN_ISO, DARWIN_PRE15_ISO, PackageImage};
use crate::download::{CatalogClient, DownloadError};
use crate::guard::Prompt;
use crate::progress::ProgressMode;

/// Builds a tar container holding one member with the given bytes.
///
/// # Errors
///
/// Returns an error if the in-memory tar writer fails.
pub fn container_with_member(name: &str, bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(u64::try_from(bytes.len()).map_err(io::Error::other)?);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, bytes)?;
    builder.into_inner()
}

/// Builds a zip archive with the given files and directory entries.
///
/// # Errors
///
/// Returns an error if the in-memory zip writer fails.
pub fn nested_zip(files: &[(&str, &[u8])], dirs: &[&str]) -> io::Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for dir in dirs {
        writer.add_directory(*dir, options)?;
    }
    for (name, bytes) in files {
        writer.start_file(*name, options)?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Returns the fixture contents used for the payload named `name`.
pub fn payload_bytes(name: &str) -> Vec<u8> {
    format!("{name} fixture contents").into_bytes()
}

/// Builds the package archive for one image: a tar container wrapping
/// `com.vmware.fusion.tools.<stem>.zip`, which holds the image and its
/// signature under `payload/`.
///
/// # Errors
///
/// Returns an error if either archive layer cannot be written.
pub fn package_archive(image: PackageImage) -> io::Result<Vec<u8>> {
    let stem = image.stem();
    let iso = format!("{stem}.iso");
    let sig = format!("{stem}.iso.sig");
    let iso_path = format!("payload/{iso}");
    let sig_path = format!("payload/{sig}");
    let iso_bytes = payload_bytes(&iso);
    let sig_bytes = payload_bytes(&sig);
    let zip = nested_zip(
        &[
            (iso_path.as_str(), iso_bytes.as_slice()),
            (sig_path.as_str(), sig_bytes.as_slice()),
        ],
        &["payload/"],
    )?;
    container_with_member(&format!("com.vmware.fusion.tools.{stem}.zip"), &zip)
}

/// Builds a core bundle whose images sit directly under `prefix`.
///
/// `prefix` is also added as a directory entry so layout probes see it.
///
/// # Errors
///
/// Returns an error if either archive layer cannot be written.
pub fn core_bundle_archive(prefix: &str) -> io::Result<Vec<u8>> {
    let darwin = format!("{prefix}{DARWIN_ISO}");
    let legacy = format!("{prefix}{DARWIN_PRE15_ISO}");
    let darwin_bytes = payload_bytes(DARWIN_ISO);
    let legacy_bytes = payload_bytes(DARWIN_PRE15_ISO);
    let zip = nested_zip(
        &[
            (darwin.as_str(), darwin_bytes.as_slice()),
            (legacy.as_str(), legacy_bytes.as_slice()),
            ("payload/VMware Fusion.app/Contents/Info.plist", b"plist".as_slice()),
        ],
        &[prefix],
    )?;
    container_with_member(CORE_MEMBER, &zip)
}

/// Renders a directory listing page with one link per entry, in the
/// style of the catalog's index pages.
pub fn listing_html(entries: &[&str]) -> String {
    let mut html = String::from(
        "<html>\n<head><title>Index of /fusion</title></head>\n<body>\n<ul>\n<li><a href=\"../\">Parent Directory</a></li>\n",
    );
    for entry in entries {
        html.push_str(&format!("<li><a href=\"{entry}/\">{entry}/</a></li>\n"));
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

/// A prompt that replays scripted answers and then reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: usize,
}

impl ScriptedPrompt {
    /// Creates a prompt answering with `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }

    /// Returns how many times a question was asked.
    pub const fn asked(&self) -> usize {
        self.asked
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, _question: &str) -> std::io::Result<Option<String>> {
        self.asked += 1;
        Ok(self.answers.pop_front())
    }
}

/// An in-memory catalog serving scripted listings and archives.
///
/// Any URL without a scripted response answers with
/// [`DownloadError::NotFound`], like a missing path on the real server.
#[derive(Debug, Default)]
pub struct StubCatalog {
    listings: HashMap<String, String>,
    archives: HashMap<String, Vec<u8>>,
    listing_requests: RefCell<Vec<String>>,
    downloads: RefCell<Vec<(String, ProgressMode)>>,
    fail_listings: Cell<bool>,
}

impl StubCatalog {
    /// Creates an empty catalog where every request is a 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves a listing page at `url` linking each of `entries`.
    #[must_use]
    pub fn with_listing(mut self, url: impl Into<String>, entries: &[&str]) -> Self {
        self.listings.insert(url.into(), listing_html(entries));
        self
    }

    /// Serves `bytes` as the archive at `url`.
    #[must_use]
    pub fn with_archive(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.archives.insert(url.into(), bytes);
        self
    }

    /// Makes every listing request fail as if the host were unreachable.
    pub fn fail_listings(&self) {
        self.fail_listings.set(true);
    }

    /// Returns the listing URLs requested so far, in order.
    pub fn listing_requests(&self) -> Vec<String> {
        self.listing_requests.borrow().clone()
    }

    /// Returns the archive downloads requested so far, in order.
    pub fn downloads(&self) -> Vec<(String, ProgressMode)> {
        self.downloads.borrow().clone()
    }

    /// Returns the archive URLs requested so far, in order.
    pub fn download_urls(&self) -> Vec<String> {
        self.downloads
            .borrow()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

impl CatalogClient for StubCatalog {
    fn fetch_listing(&self, url: &str) -> Result<String, DownloadError> {
        self.listing_requests.borrow_mut().push(url.to_owned());
        if self.fail_listings.get() {
            return Err(DownloadError::HttpError {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            });
        }
        self.listings
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound {
                url: url.to_owned(),
            })
    }

    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: ProgressMode,
    ) -> Result<u64, DownloadError> {
        self.downloads
            .borrow_mut()
            .push((url.to_owned(), progress));
        let bytes = self
            .archives
            .get(url)
            .ok_or_else(|| DownloadError::NotFound {
                url: url.to_owned(),
            })?;
        std::fs::write(dest, bytes)?;
        Ok(u64::try_from(bytes.len()).unwrap_or(u64::MAX))
    }
}

/// Lists the entry names of `dir`, sorted.
///
/// # Errors
///
/// Returns an error if `dir` cannot be read.
pub fn dir_entries(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<String>>>()?;
    names.sort();
    Ok(names)
}
