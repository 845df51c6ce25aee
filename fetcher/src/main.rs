//! `gettools` entrypoint.
//!
//! Downloads the darwin tool images for VMware Fusion into `./tools`.

use camino::Utf8PathBuf;
use clap::Parser;
use darwin_tools_fetcher::catalog::CATALOG_ROOT;
use darwin_tools_fetcher::cli::Cli;
use darwin_tools_fetcher::config::FetcherConfig;
use darwin_tools_fetcher::download::HttpCatalogClient;
use darwin_tools_fetcher::error::{FetcherError, Result};
use darwin_tools_fetcher::fetch_flow::{FetchContext, RunOutcome, run_fetch};
use darwin_tools_fetcher::guard::ConsolePrompt;
use darwin_tools_fetcher::output::write_stderr_line;
use darwin_tools_fetcher::unpack::TarZipUnpacker;
use std::io::Write;

fn main() {
    Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(stdout: &mut dyn Write) -> Result<RunOutcome> {
    let work_dir = current_work_dir()?;
    let config = FetcherConfig::load(&work_dir)?;

    let client = HttpCatalogClient::new(config.timeout);
    let stdin = std::io::stdin();
    let mut prompt = ConsolePrompt::new(stdin.lock(), std::io::stdout());
    let context = FetchContext {
        dest_dir: config.dest_dir.as_std_path(),
        catalog_root: CATALOG_ROOT,
    };

    run_fetch(&context, &client, &TarZipUnpacker, &mut prompt, stdout)
}

/// Returns the working directory, which must be readable and UTF-8.
fn current_work_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| FetcherError::PreconditionUnmet {
        reason: format!("current directory is unreadable: {e}"),
    })?;
    Utf8PathBuf::try_from(cwd).map_err(|e| FetcherError::PreconditionUnmet {
        reason: format!("current directory is not valid UTF-8: {e}"),
    })
}

/// Report the result of a run and choose the process exit code.
///
/// Only errors raised before the run reaches the network fail the process;
/// later failures are reported and the process exits successfully.
fn exit_code_for_run_result(result: Result<RunOutcome>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) if err.is_fatal() => {
            write_stderr_line(stderr, err);
            1
        }
        Err(err) => {
            write_stderr_line(stderr, err);
            0
        }
    }
}
