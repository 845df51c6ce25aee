//! Version discovery from catalog directory listings.
//!
//! The catalog publishes plain HTML index pages with one link per release
//! or build. The parser walks every text node in the document and keeps the
//! ones that look like dotted-numeric versions, maintaining a distinct,
//! ascending sequence as it goes.

use log::trace;
use scraper::Html;

use crate::version::VersionToken;

/// Accumulates version tokens from one or more HTML listings.
///
/// The sequence is kept sorted after every insertion, so [`tokens`] is
/// always in ascending dotted-numeric order. Call [`clear`] before reusing
/// the parser for an unrelated listing.
///
/// [`tokens`]: DirectoryListingParser::tokens
/// [`clear`]: DirectoryListingParser::clear
///
/// # Examples
///
/// ```
/// use darwin_tools_fetcher::listing::DirectoryListingParser;
///
/// let mut parser = DirectoryListingParser::new();
/// parser.feed("<ul><li><a href=\"13.5.0/\">13.5.0</a></li><li><a href=\"13.0.1/\">13.0.1</a></li></ul>");
/// let found: Vec<&str> = parser.tokens().iter().map(|t| t.as_str()).collect();
/// assert_eq!(found, ["13.0.1", "13.5.0"]);
/// ```
#[derive(Debug, Default)]
pub struct DirectoryListingParser {
    tokens: Vec<VersionToken>,
}

impl DirectoryListingParser {
    /// Create an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `html` and merge every version-like text node into the sequence.
    pub fn feed(&mut self, html: &str) {
        let document = Html::parse_document(html);
        for text in document.root_element().text() {
            self.push_text(text);
        }
    }

    /// Consider a single text node for inclusion.
    ///
    /// Text containing a newline or not starting with a digit is skipped, as
    /// is anything that fails dotted-numeric parsing. A trailing `/` from
    /// directory-style link text is ignored.
    pub fn push_text(&mut self, text: &str) {
        if text.contains('\n') {
            return;
        }
        if !text.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return;
        }

        let candidate = text.strip_suffix('/').unwrap_or(text);
        match candidate.parse::<VersionToken>() {
            Ok(token) => self.insert_sorted(token),
            Err(e) => trace!("ignoring listing text {text:?}: {e}"),
        }
    }

    fn insert_sorted(&mut self, token: VersionToken) {
        if let Err(index) = self.tokens.binary_search(&token) {
            self.tokens.insert(index, token);
        }
    }

    /// Return the accumulated tokens in ascending order.
    #[must_use]
    pub fn tokens(&self) -> &[VersionToken] {
        &self.tokens
    }

    /// Discard every accumulated token.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}
