//! In-place transfer progress for catalog downloads.
//!
//! A [`TransferProgress`] lives for exactly one download. It owns the start
//! instant and the running byte count (both tracked by the underlying
//! `indicatif` bar), so rate and remaining-time figures never leak between
//! transfers.

use indicatif::{ProgressBar, ProgressBarIter, ProgressDrawTarget, ProgressStyle};
use std::fmt;
use std::io::Write;

/// Line layout when the server reports a content length.
const SIZED_TEMPLATE: &str =
    "...{percent}%, {bytes}, {binary_bytes_per_sec}, {eta} remaining";

/// Line layout when the total size is unknown.
const UNSIZED_TEMPLATE: &str = "...{bytes}, {binary_bytes_per_sec}";

/// Whether a download should report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Rewrite a progress line in place while bytes arrive.
    Report,
    /// Transfer quietly.
    Silent,
}

/// Progress state for a single transfer.
pub struct TransferProgress {
    bar: ProgressBar,
}

impl fmt::Debug for TransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferProgress")
            .field("position", &self.bar.position())
            .field("length", &self.bar.length())
            .finish()
    }
}

impl TransferProgress {
    /// Start tracking a transfer of `total` bytes, drawing to `target`.
    ///
    /// Pass [`ProgressDrawTarget::hidden`] to track without drawing.
    #[must_use]
    pub fn start(total: Option<u64>, target: ProgressDrawTarget) -> Self {
        let template = if total.is_some() {
            SIZED_TEMPLATE
        } else {
            UNSIZED_TEMPLATE
        };
        let style =
            ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::with_draw_target(total, target).with_style(style);
        Self { bar }
    }

    /// Wrap `writer` so every byte written advances the progress line.
    pub fn wrap_write<W: Write>(&self, writer: W) -> ProgressBarIter<W> {
        self.bar.wrap_write(writer)
    }

    /// Return the number of bytes recorded so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Leave the final line on screen and stop ticking.
    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Remove the progress line after a failed transfer.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
