//! Destination checks and the re-fetch confirmation.
//!
//! Before anything touches the network the destination is inspected. When
//! both images are already present the user decides whether to fetch them
//! again; this is the only interactive decision in a run.

use log::debug;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::candidate::REQUIRED_IMAGES;

/// Question asked when the images are already present.
pub const REFETCH_QUESTION: &str = "You already have downloaded the tools. Download again?[y/n]";

/// What the destination directory currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationState {
    /// At least one required image is missing.
    Absent,
    /// Both required images exist.
    Present,
}

/// The user's answer to the re-fetch question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchDecision {
    /// Wipe the destination and fetch again.
    Redo,
    /// Keep the existing images and stop.
    KeepExisting,
}

/// Errors arising from the confirmation prompt.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Reading the answer or writing the question failed.
    #[error("prompt I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended before a valid answer was given.
    #[error("input closed before answering the download prompt")]
    InputClosed,
}

/// Source of answers to interactive questions.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt {
    /// Show `question` and read one answer line.
    ///
    /// Returns `Ok(None)` when the input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the question cannot be shown or the answer read.
    fn ask(&mut self, question: &str) -> std::io::Result<Option<String>>;
}

/// Line-oriented prompt over any reader and writer pair.
///
/// # Examples
///
/// ```
/// use darwin_tools_fetcher::guard::{ConsolePrompt, Prompt};
///
/// let mut prompt = ConsolePrompt::new("n\n".as_bytes(), Vec::new());
/// let answer = prompt.ask("Download again?").expect("readable");
/// assert_eq!(answer.as_deref(), Some("n"));
/// ```
#[derive(Debug)]
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    /// Create a prompt reading from `input` and writing to `output`.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for ConsolePrompt<R, W> {
    fn ask(&mut self, question: &str) -> std::io::Result<Option<String>> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }
}

/// Classify the destination directory.
///
/// Only a directory holding both required images counts as
/// [`DestinationState::Present`]; a lone image is treated as absent.
#[must_use]
pub fn check_existing(dest_dir: &Path) -> DestinationState {
    let present = REQUIRED_IMAGES
        .iter()
        .all(|name| dest_dir.join(name).is_file());
    debug!(
        "destination {} classified as {}",
        dest_dir.display(),
        if present { "present" } else { "absent" }
    );
    if present {
        DestinationState::Present
    } else {
        DestinationState::Absent
    }
}

/// Ask whether existing images should be fetched again.
///
/// Accepts `y` or `n` in any case; any other answer is reported on `out`
/// and the question is asked again, indefinitely.
///
/// # Errors
///
/// Returns [`GuardError::InputClosed`] if input ends without a valid answer,
/// or [`GuardError::Io`] if the prompt fails.
pub fn confirm_refetch(
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<RefetchDecision, GuardError> {
    loop {
        let Some(answer) = prompt.ask(REFETCH_QUESTION)? else {
            return Err(GuardError::InputClosed);
        };
        let normalised = answer.trim().to_uppercase();
        match normalised.as_str() {
            "Y" => return Ok(RefetchDecision::Redo),
            "N" => return Ok(RefetchDecision::KeepExisting),
            _ => writeln!(out, "Must enter y or n. You pressed: {normalised}")?,
        }
    }
}

/// Decide whether the run should proceed to fetching.
///
/// Returns [`RefetchDecision::Redo`] straight away when the destination is
/// absent; otherwise defers to the user.
///
/// # Errors
///
/// Propagates prompt failures from [`confirm_refetch`].
pub fn gate(
    dest_dir: &Path,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<RefetchDecision, GuardError> {
    match check_existing(dest_dir) {
        DestinationState::Absent => Ok(RefetchDecision::Redo),
        DestinationState::Present => confirm_refetch(prompt, out),
    }
}

/// Wipe `dest_dir` and create it again, empty.
///
/// # Errors
///
/// Returns an error if the old directory cannot be removed or the new one
/// cannot be created.
pub fn recreate(dest_dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dest_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::create_dir_all(dest_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedPrompt;
    use mockall::Sequence;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn dest() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn place(dir: &TempDir, names: &[&str]) {
        for name in names {
            std::fs::write(dir.path().join(name), b"image").expect("write image");
        }
    }

    #[rstest]
    #[case::empty(&[], DestinationState::Absent)]
    #[case::only_current(&["darwin.iso"], DestinationState::Absent)]
    #[case::only_legacy(&["darwinPre15.iso"], DestinationState::Absent)]
    #[case::both(&["darwin.iso", "darwinPre15.iso"], DestinationState::Present)]
    #[case::both_with_sig(&["darwin.iso", "darwinPre15.iso", "darwin.iso.sig"], DestinationState::Present)]
    fn check_existing_requires_both_images(
        dest: TempDir,
        #[case] names: &[&str],
        #[case] expected: DestinationState,
    ) {
        place(&dest, names);
        assert_eq!(check_existing(dest.path()), expected);
    }

    #[test]
    fn missing_directory_is_absent() {
        let temp = tempfile::tempdir().expect("temp dir");
        assert_eq!(
            check_existing(&temp.path().join("tools")),
            DestinationState::Absent
        );
    }

    #[rstest]
    #[case::lower("y")]
    #[case::upper("Y")]
    #[case::padded("  y ")]
    fn yes_selects_redo(#[case] answer: &str) {
        let mut prompt = ScriptedPrompt::new([answer]);
        let mut out = Vec::new();
        let decision = confirm_refetch(&mut prompt, &mut out).expect("answered");
        assert_eq!(decision, RefetchDecision::Redo);
        assert_eq!(prompt.asked(), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_answers_reprompt_until_valid() {
        let mut prompt = ScriptedPrompt::new(["x", "maybe", "n"]);
        let mut out = Vec::new();

        let decision = confirm_refetch(&mut prompt, &mut out).expect("answered");

        assert_eq!(decision, RefetchDecision::KeepExisting);
        assert_eq!(prompt.asked(), 3, "two re-prompts after the first question");
        let text = String::from_utf8(out).expect("utf-8");
        assert_eq!(
            text,
            "Must enter y or n. You pressed: X\nMust enter y or n. You pressed: MAYBE\n"
        );
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut prompt = ScriptedPrompt::new(["yes please"]);
        let mut out = Vec::new();
        let err = confirm_refetch(&mut prompt, &mut out).expect_err("input exhausted");
        assert!(matches!(err, GuardError::InputClosed));
    }

    #[test]
    fn prompt_is_asked_the_refetch_question() {
        let mut seq = Sequence::new();
        let mut prompt = MockPrompt::new();
        prompt
            .expect_ask()
            .withf(|question| question.starts_with("You already have downloaded the tools"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some("N".to_owned())));

        let mut out = Vec::new();
        let decision = confirm_refetch(&mut prompt, &mut out).expect("answered");
        assert_eq!(decision, RefetchDecision::KeepExisting);
    }

    #[rstest]
    fn gate_skips_prompt_when_absent(dest: TempDir) {
        let mut prompt = MockPrompt::new();
        prompt.expect_ask().never();
        let mut out = Vec::new();
        let decision = gate(dest.path(), &mut prompt, &mut out).expect("no prompt");
        assert_eq!(decision, RefetchDecision::Redo);
    }

    #[rstest]
    fn gate_asks_when_present(dest: TempDir) {
        place(&dest, &["darwin.iso", "darwinPre15.iso"]);
        let mut prompt = ScriptedPrompt::new(["n"]);
        let mut out = Vec::new();
        let decision = gate(dest.path(), &mut prompt, &mut out).expect("answered");
        assert_eq!(decision, RefetchDecision::KeepExisting);
    }

    #[test]
    fn console_prompt_writes_question_and_strips_newline() {
        let mut written = Vec::new();
        let answer = {
            let mut prompt = ConsolePrompt::new("Y\r\n".as_bytes(), &mut written);
            prompt.ask("Again?").expect("readable")
        };
        assert_eq!(answer.as_deref(), Some("Y"));
        assert_eq!(written, b"Again?");
    }

    #[test]
    fn console_prompt_reports_end_of_input() {
        let mut prompt = ConsolePrompt::new("".as_bytes(), Vec::new());
        assert_eq!(prompt.ask("Again?").expect("readable"), None);
    }

    #[rstest]
    fn recreate_wipes_existing_contents(dest: TempDir) {
        let tools = dest.path().join("tools");
        std::fs::create_dir_all(tools.join("payload")).expect("create nested");
        std::fs::write(tools.join("darwin.iso"), b"old").expect("write");

        recreate(&tools).expect("recreate");

        assert!(tools.is_dir());
        assert_eq!(std::fs::read_dir(&tools).expect("read dir").count(), 0);
    }

    #[rstest]
    fn recreate_creates_missing_directory(dest: TempDir) {
        let tools = dest.path().join("tools");
        recreate(&tools).expect("recreate");
        assert!(tools.is_dir());
    }
}
