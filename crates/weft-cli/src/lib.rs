//! Command-line runtime for the `weft` tree query tool.
//!
//! The module owns argument parsing, configuration loading, telemetry
//! bootstrapping and output rendering. [`run`] takes its IO streams as
//! parameters so tests can drive the whole CLI with in-memory buffers.
//!
//! Exit codes: `0` on success, `1` when rules fail to compile, input cannot be
//! read or a scan finds unmatched delimiters, `2` on usage errors.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

mod cli;
mod commands;
mod config;
mod errors;
mod logging;
mod output;
mod telemetry;

pub use cli::{OutputFormat, ResolvedOutputFormat};
pub use config::{DEFAULT_LOG_FILTER, WeftConfig};
pub use logging::{LogFormat, LogFormatParseError};
pub use telemetry::{TelemetryError, initialise as initialise_telemetry};

use cli::Cli;
use commands::Settings;
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
use errors::AppError;

/// Runs the CLI using the provided arguments and IO handles.
///
/// `stdout_is_terminal` decides what `--output auto` resolves to.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, stdout_is_terminal, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    stdout_is_terminal: bool,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader + ?Sized,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = match Cli::try_parse_from(command_arguments(&args, &split)) {
        Ok(cli) => cli,
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => return report_error(&AppError::CliUsage(error), stderr),
    };

    let result = loader
        .load(&split.config_arguments)
        .and_then(|config| execute(&cli, &config, stdout, stdout_is_terminal));
    match result {
        Ok(exit_code) => exit_code,
        Err(error) => report_error(&error, stderr),
    }
}

fn execute<W: Write>(
    cli: &Cli,
    config: &WeftConfig,
    stdout: &mut W,
    stdout_is_terminal: bool,
) -> Result<ExitCode, AppError> {
    telemetry::initialise(config.log_filter(), config.log_format())?;
    let settings = Settings {
        engine: config.engine(),
        queries_dirs: config.queries_dirs().to_vec(),
    };
    let format = config.output().resolve(stdout_is_terminal);

    let report = commands::execute(&cli.command, &settings)?;
    output::write_report(&report, format, stdout)?;
    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report_error<E: Write>(error: &AppError, stderr: &mut E) -> ExitCode {
    tracing::debug!(%error, "command failed");
    match error {
        // clap renders its own usage text, which already ends in a newline.
        AppError::CliUsage(usage) => {
            let _ = write!(stderr, "{usage}");
        }
        _ => {
            let _ = writeln!(stderr, "weft: {error}");
        }
    }
    error.exit_code()
}

#[cfg(test)]
mod tests;
