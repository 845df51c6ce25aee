//! Darwin tools fetcher library.
//!
//! Locates the newest VMware Fusion release in the public catalog and
//! retrieves the `darwin.iso` and `darwinPre15.iso` tool images into a local
//! directory. It is used by the `gettools` binary and can be driven
//! programmatically with stub capabilities for testing.
//!
//! # Modules
//!
//! - [`candidate`] - Candidate archive locations and payload path rewriting
//! - [`cascade`] - Ordered acquisition strategies with staged commits
//! - [`catalog`] - Two-level release and build resolution
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Destination and timeout configuration
//! - [`download`] - Catalog transport over blocking HTTP
//! - [`error`] - Top-level error type and exit policy
//! - [`fetch_flow`] - Orchestration of a complete run
//! - [`guard`] - Destination checks and the re-fetch prompt
//! - [`listing`] - Version extraction from HTML directory listings
//! - [`output`] - User-facing narration
//! - [`progress`] - In-place transfer progress reporting
//! - [`unpack`] - Container and nested archive extraction
//! - [`version`] - Dotted-numeric version tokens and selection

pub mod candidate;
pub mod cascade;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch_flow;
pub mod guard;
pub mod listing;
pub mod output;
pub mod progress;
pub mod unpack;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
