//! Command-line argument definitions for `weft`.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use weft_query::{Feature, SupportedLanguage};

/// Output format selection for command results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit JSON.
    Json,
}

/// Output format after resolving `auto` against the terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Human-readable lines.
    Human,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Resolves `auto` based on whether stdout is a terminal.
    #[must_use]
    pub const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto if stdout_is_terminal => ResolvedOutputFormat::Human,
            Self::Auto | Self::Json => ResolvedOutputFormat::Json,
            Self::Human => ResolvedOutputFormat::Human,
        }
    }
}

const CONFIG_HELP: &str = "\
Configuration flags go before the command:
  --config-path <FILE>           TOML configuration file [env: WEFT_CONFIG_PATH]
  --log-filter <FILTER>          Tracing filter directive [default: warn]
  --log-format <FORMAT>          compact or json [default: compact]
  --output <FORMAT>              auto, human or json [default: auto]
  --queries-dir <DIR>            Rule directory searched before the built-in rules; repeatable
  --max-matches <N>              Match cap for one pass
  --max-sequence-steps <N>       Step budget for one rule attempt
  --max-injection-depth <N>      Injection recursion limit
Each flag can also be set as WEFT_<NAME> in the environment or in the file.";

/// Runs tree queries from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "weft",
    version,
    disable_help_subcommand = true,
    after_help = CONFIG_HELP
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Compiles rule files and reports their diagnostics.
    Check {
        /// Fails on undefined capture references instead of dropping the rule.
        #[arg(long)]
        strict: bool,
        /// Rule files to compile.
        #[arg(value_name = "QUERY", required = true)]
        queries: Vec<Utf8PathBuf>,
    },
    /// Runs one feature's rules over a source file.
    Run {
        /// Grammar used to parse the source; inferred from its extension
        /// when omitted.
        #[arg(long)]
        language: Option<SupportedLanguage>,
        /// The feature to resolve.
        #[arg(long)]
        feature: Feature,
        /// Rule file used instead of the registered rules.
        #[arg(long, value_name = "FILE")]
        query: Option<Utf8PathBuf>,
        /// Source file to parse.
        #[arg(value_name = "SOURCE")]
        source: Utf8PathBuf,
    },
    /// Pairs delimiters in a text file without parsing it.
    Brackets {
        /// Rule file declaring the delimiter pairs.
        #[arg(long, value_name = "FILE", conflicts_with = "language")]
        query: Option<Utf8PathBuf>,
        /// Use the bracket rules registered for this language.
        #[arg(long)]
        language: Option<String>,
        /// Text file to scan.
        #[arg(value_name = "SOURCE")]
        source: Utf8PathBuf,
    },
}
