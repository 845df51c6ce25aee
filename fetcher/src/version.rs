//! Dotted-numeric version tokens and latest-version selection.
//!
//! Catalog releases and builds are named by dot-separated non-negative
//! integers (`13.0.2`, `21139760`). Ordering compares the integer segments
//! left to right, so `9.0` sorts before `10.0` and a strict prefix sorts
//! before any extension of it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors arising from version parsing and selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The token is not a dot-separated list of non-negative integers.
    #[error("invalid version token \"{value}\": {reason}")]
    InvalidToken {
        /// The rejected token.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A listing produced no version tokens at all.
    #[error("no version found in listing at {url}")]
    NoVersionFound {
        /// The listing URL that yielded nothing.
        url: String,
    },
}

/// A validated dotted-numeric version such as `13.0.1`.
///
/// # Examples
///
/// ```
/// use darwin_tools_fetcher::version::VersionToken;
///
/// let older: VersionToken = "9.0".parse().expect("valid token");
/// let newer: VersionToken = "10.0".parse().expect("valid token");
/// assert!(older < newer);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken {
    raw: String,
    segments: Vec<u64>,
}

impl VersionToken {
    /// Return the token exactly as it appeared in the listing.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Return the parsed integer segments.
    #[must_use]
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }
}

impl FromStr for VersionToken {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let segments = parse_segments(value)?;
        Ok(Self {
            raw: value.to_owned(),
            segments,
        })
    }
}

impl TryFrom<&str> for VersionToken {
    type Error = VersionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Orders by numeric segments, then by raw text.
///
/// Tokens with equal segments but different spelling, such as `1.0` and
/// `1.00`, sort by byte order of their text, so the longer spelling sorts
/// last and is the one [`select_latest`] returns, whatever order the
/// listing presented them in.
impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments
            .cmp(&other.segments)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AsRef<str> for VersionToken {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn parse_segments(value: &str) -> Result<Vec<u64>, VersionError> {
    let invalid = |reason: String| VersionError::InvalidToken {
        value: value.to_owned(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("token must not be empty".to_owned()));
    }

    value
        .split('.')
        .map(|segment| {
            if segment.is_empty() {
                return Err(invalid("empty segment".to_owned()));
            }
            if let Some(bad) = segment.chars().find(|c| !c.is_ascii_digit()) {
                return Err(invalid(format!("non-digit character '{bad}'")));
            }
            segment
                .parse::<u64>()
                .map_err(|e| invalid(format!("segment \"{segment}\" out of range: {e}")))
        })
        .collect()
}

/// Select the newest version from a sequence sorted ascending.
///
/// The newest version is the last element. An empty sequence means the
/// listing at `url` was malformed or unreachable in a way that produced no
/// parseable content, which is fatal for resolution.
///
/// # Errors
///
/// Returns [`VersionError::NoVersionFound`] when `sorted` is empty.
///
/// # Examples
///
/// ```
/// use darwin_tools_fetcher::version::{VersionToken, select_latest};
///
/// let tokens: Vec<VersionToken> = ["2.1", "9.0", "10.0"]
///     .iter()
///     .map(|raw| raw.parse().expect("valid token"))
///     .collect();
/// let latest = select_latest(&tokens, "https://example.test/").expect("non-empty");
/// assert_eq!(latest.as_str(), "10.0");
/// ```
pub fn select_latest<'a>(
    sorted: &'a [VersionToken],
    url: &str,
) -> Result<&'a VersionToken, VersionError> {
    sorted.last().ok_or_else(|| VersionError::NoVersionFound {
        url: url.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn token(raw: &str) -> VersionToken {
        raw.parse().expect("valid token")
    }

    #[rstest]
    #[case::numeric_not_lexical("9.0", "10.0")]
    #[case::prefix_sorts_first("13.0", "13.0.1")]
    #[case::later_segment("13.0.1", "13.0.2")]
    #[case::single_segment("20486664", "21139760")]
    fn orders_by_integer_segments(#[case] lower: &str, #[case] higher: &str) {
        assert!(token(lower) < token(higher), "{lower} should sort before {higher}");
    }

    #[rstest]
    #[case::empty("")]
    #[case::leading_dot(".13")]
    #[case::trailing_dot("13.")]
    #[case::double_dot("13..0")]
    #[case::letters("13.0b")]
    #[case::sign("+13")]
    #[case::whitespace("13 .0")]
    fn rejects_malformed_tokens(#[case] raw: &str) {
        let result = raw.parse::<VersionToken>();
        assert!(
            matches!(result, Err(VersionError::InvalidToken { .. })),
            "expected InvalidToken for {raw:?}, got {result:?}"
        );
    }

    #[test]
    fn equal_segments_with_different_text_are_ordered_consistently() {
        let short = token("1.0");
        let padded = token("1.00");
        assert_ne!(short, padded);
        assert_ne!(short.cmp(&padded), Ordering::Equal);
    }

    #[rstest]
    #[case::short_first(["1.0", "1.00"])]
    #[case::padded_first(["1.00", "1.0"])]
    fn equal_segments_select_longer_spelling(#[case] listed: [&str; 2]) {
        let mut tokens: Vec<VersionToken> = listed.into_iter().map(token).collect();
        tokens.sort();
        let latest = select_latest(&tokens, "https://example.test/").expect("latest");
        assert_eq!(latest.as_str(), "1.00");
    }

    #[test]
    fn select_latest_returns_maximum_of_sorted_sequence() {
        let mut tokens = vec![token("9.0"), token("10.0"), token("2.1")];
        tokens.sort();
        let latest = select_latest(&tokens, "https://example.test/").expect("latest");
        assert_eq!(latest.as_str(), "10.0");
    }

    #[test]
    fn select_latest_fails_on_empty_listing() {
        let err = select_latest(&[], "https://example.test/fusion/").expect_err("empty");
        assert_eq!(
            err,
            VersionError::NoVersionFound {
                url: "https://example.test/fusion/".to_owned()
            }
        );
        assert!(err.to_string().contains("no version found"));
    }

    #[test]
    fn segments_are_exposed() {
        assert_eq!(token("13.5.2").segments(), &[13, 5, 2]);
    }
}
