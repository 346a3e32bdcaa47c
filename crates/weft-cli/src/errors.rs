//! Error types for the CLI runtime.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use weft_query::{EngineError, LoadError, QueryError, TreeError};

use crate::telemetry::TelemetryError;

/// Exit status for invalid invocations.
const USAGE_EXIT: u8 = 2;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("failed to read {path}: {source}")]
    ReadInput { path: Utf8PathBuf, source: io::Error },
    #[error("cannot infer the language of {path}; pass --language")]
    UnknownLanguage { path: Utf8PathBuf },
    #[error("failed to load rule files: {0}")]
    Load(#[from] LoadError),
    #[error("{path}: {source}")]
    Compile { path: Utf8PathBuf, source: QueryError },
    #[error("failed to parse {path}: {source}")]
    Parse { path: Utf8PathBuf, source: TreeError },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to serialise output: {0}")]
    Serialise(serde_json::Error),
    #[error("failed to write output: {0}")]
    Write(io::Error),
}

impl AppError {
    /// Exit status reported for this error.
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::CliUsage(_) => ExitCode::from(USAGE_EXIT),
            _ => ExitCode::FAILURE,
        }
    }
}
