// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::UnresolvedPolicy;

/// Command-line arguments for `topostream`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "topostream",
    version,
    about = "Emit newline-delimited JSON records in dependency order as they arrive.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Topostream.toml` in the current working directory, if it
    /// exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Input file with one JSON object per line. `-` or omitted reads stdin.
    #[arg(long, value_name = "PATH")]
    pub input: Option<String>,

    /// Record field holding the node id. Overrides `[input].id_field`.
    #[arg(long, value_name = "NAME")]
    pub id_field: Option<String>,

    /// Record field holding the dependency list. Overrides
    /// `[input].deps_field`.
    #[arg(long, value_name = "NAME")]
    pub deps_field: Option<String>,

    /// Pause input while this many records are being resolved (0 = no limit).
    #[arg(long, value_name = "N")]
    pub max_in_flight: Option<usize>,

    /// What to do when records are left unresolved (fail, warn).
    #[arg(long, value_name = "POLICY")]
    pub on_unresolved: Option<UnresolvedPolicy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TOPOSTREAM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load config and print the effective settings, but don't read input.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
