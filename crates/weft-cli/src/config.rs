//! Layered configuration for the `weft` binary.
//!
//! [`WeftConfig`] is merged from its defaults, a TOML file named by
//! `--config-path` or `WEFT_CONFIG_PATH`, `WEFT_*` environment variables and
//! the configuration flags given before the subcommand. Later layers win.
//! Only flags listed in [`CONFIG_CLI_FLAGS`] reach the loader; everything
//! from the first other token onwards is parsed as the command.

use std::ffi::{OsStr, OsString};

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use weft_query::EngineConfig;

use crate::cli::OutputFormat;
use crate::errors::AppError;
use crate::logging::LogFormat;

/// Flags consumed by the configuration loader.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--output",
    "--queries-dir",
    "--max-matches",
    "--max-sequence-steps",
    "--max-injection-depth",
];

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "warn";

fn default_log_filter() -> String {
    String::from(DEFAULT_LOG_FILTER)
}

fn default_max_matches() -> usize {
    EngineConfig::default().max_matches()
}

fn default_max_sequence_steps() -> usize {
    EngineConfig::default().max_sequence_steps()
}

fn default_max_injection_depth() -> usize {
    EngineConfig::default().max_injection_depth()
}

/// Settings shared by every `weft` subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WEFT")]
pub struct WeftConfig {
    /// Tracing filter directive, for example `weft_query=debug`.
    #[ortho_config(default = default_log_filter())]
    #[serde(default = "default_log_filter")]
    log_filter: String,
    /// Log line format.
    #[ortho_config(default = LogFormat::Compact)]
    #[serde(default)]
    log_format: LogFormat,
    /// How results are rendered.
    #[ortho_config(default = OutputFormat::Auto)]
    #[serde(default)]
    output: OutputFormat,
    /// Directories of `<language>/<feature>.scm` rule files, searched before
    /// the built-in rules. Later directories win.
    #[ortho_config(merge_strategy = "append")]
    #[serde(default)]
    queries_dir: Vec<Utf8PathBuf>,
    /// Match cap for one pass.
    #[ortho_config(default = default_max_matches())]
    #[serde(default = "default_max_matches")]
    max_matches: usize,
    /// Step budget for one rule attempt.
    #[ortho_config(default = default_max_sequence_steps())]
    #[serde(default = "default_max_sequence_steps")]
    max_sequence_steps: usize,
    /// Injection recursion limit.
    #[ortho_config(default = default_max_injection_depth())]
    #[serde(default = "default_max_injection_depth")]
    max_injection_depth: usize,
}

impl Default for WeftConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_format: LogFormat::default(),
            output: OutputFormat::default(),
            queries_dir: Vec::new(),
            max_matches: default_max_matches(),
            max_sequence_steps: default_max_sequence_steps(),
            max_injection_depth: default_max_injection_depth(),
        }
    }
}

impl WeftConfig {
    /// Returns the tracing filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log line format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the requested output format.
    #[must_use]
    pub const fn output(&self) -> OutputFormat {
        self.output
    }

    /// Returns the rule directories in search order.
    #[must_use]
    pub fn queries_dirs(&self) -> &[Utf8PathBuf] {
        &self.queries_dir
    }

    /// Returns the engine limits.
    #[must_use]
    pub const fn engine(&self) -> EngineConfig {
        EngineConfig::new(
            self.max_matches,
            self.max_sequence_steps,
            self.max_injection_depth,
        )
    }
}

pub(crate) trait ConfigLoader {
    /// Loads configuration from the flags that precede the subcommand.
    ///
    /// `args` starts with the program name, as produced by
    /// [`split_config_arguments`].
    fn load(&self, args: &[OsString]) -> Result<WeftConfig, AppError>;
}

/// Loads [`WeftConfig`] through its file, environment and flag layers.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<WeftConfig, AppError> {
        let config = WeftConfig::load_from_iter(args.iter().cloned())
            .map_err(AppError::LoadConfiguration)?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }
    let (flag, inline_value) = text
        .split_once('=')
        .map_or((&*text, false), |(flag, _)| (flag, true));
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

/// Arguments split between the configuration loader and the command parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    /// The program name followed by every configuration flag and its value.
    pub(crate) config_arguments: Vec<OsString>,
    /// Index of the first argument that belongs to the command.
    pub(crate) command_start: usize,
}

/// Peels the leading configuration flags off `args`.
pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };
    let mut config_arguments = vec![program.clone()];
    let mut pending_value = false;
    for argument in rest {
        if pending_value {
            pending_value = false;
        } else {
            match process_config_flag(argument) {
                FlagAction::Include { needs_value } => pending_value = needs_value,
                FlagAction::Skip => break,
            }
        }
        config_arguments.push(argument.clone());
    }
    ConfigArgumentSplit {
        command_start: config_arguments.len(),
        config_arguments,
    }
}

/// Returns the program name followed by the command arguments.
pub(crate) fn command_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.get(split.command_start..).unwrap_or_default())
        .cloned()
        .collect()
}
