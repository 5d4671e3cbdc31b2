// src/lib.rs

//! Online, streaming topological sort.
//!
//! Payloads arrive on an input stream in any order. A resolver maps each one
//! to its id and dependency ids, and every payload is emitted as soon as all
//! of its dependencies have been emitted. See [`TopoSort`].

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod input;
pub mod logging;
pub mod resolve;
pub mod stream;
pub mod types;

use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_or_default, validate_input_fields, ConfigFile, InputSection};
use crate::errors::{Result, TopostreamError};
use crate::input::{json_lines, json_resolver, JsonKey};
use crate::types::UnresolvedPolicy;

pub use crate::engine::{
    ResolveFailure, SortEvent, SortOptions, SortOutcome, SortStats, SubmissionId,
    UnresolvedNodes,
};
pub use crate::graph::{NodeInfo, NodeState, Registry, UnresolvedDiagnosis};
pub use crate::resolve::{NodeResolver, ResolveCallback, ResolveFuture, Resolver};
pub use crate::stream::{SortReport, SortedStream, TopoSort};

/// How a command-line run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Records were left unresolved and the policy is `fail`.
    Unresolved,
}

/// Effective settings after applying CLI overrides to the config file.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub options: SortOptions,
    pub input: InputSection,
    pub on_unresolved: UnresolvedPolicy,
}

impl RunSettings {
    pub fn from_args(args: &CliArgs, cfg: &ConfigFile) -> Result<Self> {
        let mut options = cfg.sort_options();
        if let Some(max) = args.max_in_flight {
            options = options.with_max_in_flight(max);
        }

        let mut input = cfg.input.clone();
        if let Some(field) = &args.id_field {
            input.id_field = field.clone();
        }
        if let Some(field) = &args.deps_field {
            input.deps_field = field.clone();
        }
        validate_input_fields(&input)?;

        Ok(Self {
            options,
            input,
            on_unresolved: args.on_unresolved.unwrap_or(cfg.config.on_unresolved),
        })
    }
}

/// What [`sort_json_lines`] observed, apart from the records it wrote.
#[derive(Debug, Clone)]
pub struct LinesSummary {
    pub stats: SortStats,
    /// Unresolved ids in first-reference order. Empty on a clean run.
    pub unresolved: Vec<JsonKey>,
    pub diagnosis: Option<UnresolvedDiagnosis<JsonKey>>,
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the input source (file or stdin)
/// - the sort itself, writing records to stdout
/// - the unresolved policy
pub async fn run(args: CliArgs) -> Result<RunStatus> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    let settings = RunSettings::from_args(&args, &cfg)?;

    if args.dry_run {
        print_dry_run(&settings);
        return Ok(RunStatus::Completed);
    }

    let mut stdout = BufWriter::new(tokio::io::stdout());
    let summary = match args.input.as_deref() {
        None | Some("-") => sort_json_lines(tokio::io::stdin(), &mut stdout, &settings).await?,
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| TopostreamError::InputError(format!("cannot open {path}: {e}")))?;
            sort_json_lines(file, &mut stdout, &settings).await?
        }
    };

    if summary.unresolved.is_empty() {
        return Ok(RunStatus::Completed);
    }

    report_unresolved(&summary);
    match settings.on_unresolved {
        UnresolvedPolicy::Fail => Ok(RunStatus::Unresolved),
        UnresolvedPolicy::Warn => Ok(RunStatus::Completed),
    }
}

/// Sort newline-delimited JSON from `reader`, writing each record to
/// `writer` (one per line) once its dependencies have been written.
///
/// Records whose id cannot be read, including lines that are not valid
/// UTF-8, are skipped; the driver logs them. A read error on `reader` stops
/// the sort and is returned once the records already read are written.
pub async fn sort_json_lines<R, W>(
    reader: R,
    writer: &mut W,
    settings: &RunSettings,
) -> Result<LinesSummary>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let resolver = json_resolver(&settings.input.id_field, &settings.input.deps_field);
    let (lines, read_status) = json_lines(reader);
    let mut events = TopoSort::new(resolver)
        .with_options(settings.options)
        .spawn(lines);

    let mut unresolved = Vec::new();
    while let Some(event) = events.recv().await {
        match event {
            SortEvent::Item(line) => {
                writer.write_all(line.text.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            SortEvent::ResolveFailed(failure) => {
                debug!(submission = %failure.submission, "record skipped");
            }
            SortEvent::Unresolved(nodes) => unresolved = nodes.ids,
        }
    }
    writer.flush().await?;

    let outcome = events.join().await?;
    read_status.check()?;
    info!(
        emitted = outcome.stats.emitted,
        skipped = outcome.stats.failed,
        unresolved = unresolved.len(),
        "input sorted"
    );

    Ok(LinesSummary {
        stats: outcome.stats,
        unresolved,
        diagnosis: outcome.diagnosis,
    })
}

/// Explain unresolved records on stderr.
fn report_unresolved(summary: &LinesSummary) {
    eprintln!(
        "topostream: {} id(s) never resolved: {}",
        summary.unresolved.len(),
        join_keys(&summary.unresolved)
    );

    let Some(diagnosis) = &summary.diagnosis else {
        return;
    };
    for cycle in &diagnosis.cycles {
        eprintln!("  cycle: {}", join_keys(cycle));
    }
    if !diagnosis.missing.is_empty() {
        eprintln!("  missing: {}", join_keys(&diagnosis.missing));
    }
    if !diagnosis.blocked.is_empty() {
        eprintln!("  blocked: {}", join_keys(&diagnosis.blocked));
    }
}

fn join_keys(keys: &[JsonKey]) -> String {
    keys.iter()
        .map(JsonKey::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print the effective settings.
fn print_dry_run(settings: &RunSettings) {
    println!("topostream dry-run");
    match settings.options.max_in_flight {
        Some(max) => println!("  max_in_flight = {max}"),
        None => println!("  max_in_flight = unbounded"),
    }
    println!("  output_buffer = {}", settings.options.output_buffer);
    println!("  on_unresolved = {}", settings.on_unresolved);
    println!("  id_field = {:?}", settings.input.id_field);
    println!("  deps_field = {:?}", settings.input.deps_field);

    debug!("dry-run complete (no input read)");
}
