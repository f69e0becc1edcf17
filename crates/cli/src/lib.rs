#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` is the thin command-line front-end of the `treesync` binary. It
//! parses arguments with [`clap`], merges them over an optional JSON config
//! file, builds providers through [`transport::provider_for_root`], and drives
//! the [`engine`] listing, planning and execution stages.
//!
//! Three commands are recognised:
//!
//! - `init [FILE] [--force]` writes a starter `treesync.json`.
//! - `ls [ROOT...]` lists the entries of each root (by default the configured
//!   origin and target).
//! - `sync [ORIGIN] [TARGET]` previews the plan, asks
//!   `Perform N operations? (Y/n):` unless `--yes` or `--dry-run` is given,
//!   and then executes the operations.
//!
//! # Design
//!
//! [`run`] accepts an iterator of arguments together with handles for
//! standard output and error; [`run_with_input`] additionally takes the
//! reader the confirmation prompt consumes, which keeps every command
//! testable in-process. Each invocation builds its own multi-threaded tokio
//! runtime and blocks on the command future.
//!
//! Progress callbacks fired by the engine on worker threads are forwarded
//! over an unbounded channel, so output is written by the calling thread
//! only and appears in completion order.
//!
//! # Errors
//!
//! Usage errors and configuration problems exit with status `1`. A failed
//! listing, plan or execution exits with status `2`. Diagnostics are written
//! to standard error prefixed with `treesync: error:`.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(["treesync", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(status, 0);
//! assert!(String::from_utf8_lossy(&stdout).starts_with("treesync "));
//! ```

mod arguments;
mod commands;
mod config;
mod error;
mod prompt;
mod render;
mod settings;

use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, Write};

use clap::error::ErrorKind;
use logging::VerbosityConfig;

pub use config::{
    CompareMode, ConfigError, ConfigFile, DEFAULT_COMPARE_CONCURRENCY, DEFAULT_CONFIG_FILE,
    DEFAULT_REQUEST_CONCURRENCY, ProviderConfig, ProviderSection, SCHEMA_VERSION, load_config,
};
pub use error::CliError;
pub use render::{format_duration, format_size};

use crate::arguments::{CommandArgs, ParsedArgs, parse_args};
use crate::render::Renderer;
use crate::settings::{LsSettings, SyncSettings};

/// Largest exit status the process can report.
const MAX_EXIT_CODE: i32 = 255;

/// Runs the command line, reading prompt answers from standard input.
///
/// Returns the process exit status.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let stdin = io::stdin();
    let mut input = stdin.lock();
    run_with_input(arguments, &mut input, stdout, stderr)
}

/// Runs the command line, reading prompt answers from `input`.
///
/// Returns the process exit status.
pub fn run_with_input<I, S, In, Out, Err>(
    arguments: I,
    input: &mut In,
    stdout: &mut Out,
    stderr: &mut Err,
) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    In: BufRead,
    Out: Write,
    Err: Write,
{
    let parsed = match parse_args(arguments) {
        Ok(parsed) => parsed,
        Err(error) => return report_usage(&error, stdout, stderr),
    };

    // A subscriber may already be installed when running in-process.
    let _ = logging::init_tracing(&VerbosityConfig::from_verbose_level(parsed.global.verbose));

    match execute(parsed, input, stdout, stderr) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(stderr, "treesync: error: {error}");
            error.exit_code()
        }
    }
}

fn execute<In, Out, Err>(
    parsed: ParsedArgs,
    input: &mut In,
    stdout: &mut Out,
    stderr: &mut Err,
) -> Result<(), CliError>
where
    In: BufRead,
    Out: Write,
    Err: Write,
{
    let cwd = env::current_dir().map_err(CliError::CurrentDir)?;
    let mut renderer = Renderer::new(&parsed.global, cwd.clone());

    match parsed.command {
        CommandArgs::Init(args) => commands::init::execute(&args, &cwd, &renderer, stdout),
        CommandArgs::Ls(args) => {
            let config = load_config(parsed.global.config.as_deref(), &cwd)?;
            let settings = LsSettings::resolve(&config, &args, &cwd);
            runtime()?.block_on(commands::ls::execute(settings, &renderer, stdout))
        }
        CommandArgs::Sync(args) => {
            let config = load_config(parsed.global.config.as_deref(), &cwd)?;
            let settings = SyncSettings::resolve(&config, &args, &cwd)?;
            renderer.show_skipped = args.show_skipped;
            renderer.show_params = args.show_params;
            runtime()?.block_on(commands::sync::execute(
                settings, &renderer, input, stdout, stderr,
            ))
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

fn report_usage<Out, Err>(error: &clap::Error, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(stdout, "{}", error.render());
            0
        }
        _ => {
            let _ = write!(stderr, "{}", error.render());
            1
        }
    }
}

/// Converts a status returned by [`run`] into an [`ExitCode`](std::process::ExitCode).
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(u8::try_from(clamped).unwrap_or(u8::MAX))
}
