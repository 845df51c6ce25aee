//! Command-line interface for `gettools`.
//!
//! The tool takes no options of its own; clap supplies `--help` and
//! `--version` and rejects anything else.

use clap::Parser;

/// Fetch the darwin tool images for VMware Fusion guests.
#[derive(Parser, Debug, Default)]
#[command(name = "gettools")]
#[command(version, about)]
#[command(long_about = concat!(
    "Fetch the darwin tool images for VMware Fusion guests.\n\n",
    "Finds the newest Fusion release and build in the VMware catalog and ",
    "downloads darwin.iso and darwinPre15.iso into ./tools. Package archives ",
    "are tried first, then the core bundle in each known location.\n\n",
    "If both images are already present you are asked before they are ",
    "replaced.",
))]
#[command(after_help = concat!(
    "CONFIGURATION:\n",
    "  gettools.toml        [download] timeout_secs = N\n",
    "  GETTOOLS_TIMEOUT_SECS  overrides the HTTP timeout (default 600)",
))]
pub struct Cli {}
