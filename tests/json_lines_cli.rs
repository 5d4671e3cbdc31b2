// tests/json_lines_cli.rs

use std::error::Error;
use std::io::{self, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use topostream::cli::CliArgs;
use topostream::config::ConfigFile;
use topostream::errors::TopostreamError;
use topostream::input::JsonKey;
use topostream::{run, sort_json_lines, LinesSummary, RunSettings, RunStatus};
use topostream_test_utils::builders::ConfigFileBuilder;
use topostream_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn settings(cfg: &ConfigFile) -> RunSettings {
    RunSettings::from_args(&CliArgs::default(), cfg).unwrap()
}

async fn sort_text(
    input: &'static str,
    cfg: &ConfigFile,
) -> Result<(Vec<String>, LinesSummary), Box<dyn Error>> {
    sort_bytes(input.as_bytes(), cfg).await
}

async fn sort_bytes(
    input: &'static [u8],
    cfg: &ConfigFile,
) -> Result<(Vec<String>, LinesSummary), Box<dyn Error>> {
    init_tracing();
    let mut out: Vec<u8> = Vec::new();
    let summary = with_timeout(sort_json_lines(input, &mut out, &settings(cfg))).await?;
    let lines = String::from_utf8(out)?
        .lines()
        .map(str::to_string)
        .collect();
    Ok((lines, summary))
}

#[tokio::test]
async fn records_are_written_in_dependency_order() -> TestResult {
    let input = concat!(
        "{\"id\": \"app\", \"deps\": [\"lib\", \"log\"]}\n",
        "\n",
        "{\"id\": \"lib\", \"deps\": [\"log\"], \"extra\": true}\n",
        "{\"id\": \"log\"}\n",
    );

    let (lines, summary) = sort_text(input, &ConfigFile::default()).await?;

    assert_eq!(
        lines,
        vec![
            "{\"id\": \"log\"}",
            "{\"id\": \"lib\", \"deps\": [\"log\"], \"extra\": true}",
            "{\"id\": \"app\", \"deps\": [\"lib\", \"log\"]}",
        ]
    );
    assert!(summary.unresolved.is_empty());
    assert_eq!(summary.stats.emitted, 3);
    Ok(())
}

#[tokio::test]
async fn malformed_records_are_skipped() -> TestResult {
    let input = "{\"id\": 1}\nnot json\n{\"deps\": [1]}\n{\"id\": 2, \"deps\": [1]}\n";

    let (lines, summary) = sort_text(input, &ConfigFile::default()).await?;

    assert_eq!(lines, vec!["{\"id\": 1}", "{\"id\": 2, \"deps\": [1]}"]);
    assert_eq!(summary.stats.failed, 2);
    assert!(summary.unresolved.is_empty());
    Ok(())
}

#[tokio::test]
async fn custom_fields_from_config() -> TestResult {
    let cfg = ConfigFileBuilder::new().fields("name", "after").build();
    let input = "{\"name\": \"b\", \"after\": [\"a\"]}\n{\"name\": \"a\"}\n";

    let (lines, _) = sort_text(input, &cfg).await?;
    assert_eq!(lines, vec!["{\"name\": \"a\"}", "{\"name\": \"b\", \"after\": [\"a\"]}"]);
    Ok(())
}

#[tokio::test]
async fn unresolved_records_are_summarised() -> TestResult {
    let input = "{\"id\": \"a\", \"deps\": [\"b\"]}\n{\"id\": \"b\", \"deps\": [\"a\"]}\n{\"id\": \"c\", \"deps\": [\"ghost\"]}\n";

    let (lines, summary) = sort_text(input, &ConfigFile::default()).await?;
    assert!(lines.is_empty());

    let key = |text: &str| JsonKey::from_value(&serde_json::Value::String(text.to_string()));
    assert_eq!(summary.unresolved, vec![key("a")?, key("b")?, key("c")?, key("ghost")?]);

    let diagnosis = summary.diagnosis.expect("diagnosis for unresolved records");
    assert_eq!(diagnosis.cycles, vec![vec![key("a")?, key("b")?]]);
    assert_eq!(diagnosis.missing, vec![key("ghost")?]);
    assert_eq!(diagnosis.blocked, vec![key("c")?]);
    Ok(())
}

#[tokio::test]
async fn reads_from_a_file() -> TestResult {
    init_tracing();
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{{\"id\": 2, \"deps\": [1]}}")?;
    writeln!(file, "{{\"id\": 1}}")?;
    file.flush()?;

    let reader = tokio::fs::File::open(file.path()).await?;
    let mut out: Vec<u8> = Vec::new();
    let summary = with_timeout(sort_json_lines(
        reader,
        &mut out,
        &settings(&ConfigFile::default()),
    ))
    .await?;

    assert_eq!(String::from_utf8(out)?, "{\"id\": 1}\n{\"id\": 2, \"deps\": [1]}\n");
    assert_eq!(summary.stats.submitted, 2);
    Ok(())
}

#[tokio::test]
async fn invalid_utf8_line_is_skipped_and_reading_continues() -> TestResult {
    let input: &[u8] = b"{\"id\":1}\n{\"id\":\"\xff\"}\n{\"id\":2,\"deps\":[1]}\n{\"id\":3}\n";

    let (lines, summary) = sort_bytes(input, &ConfigFile::default()).await?;

    assert_eq!(lines, vec!["{\"id\":1}", "{\"id\":2,\"deps\":[1]}", "{\"id\":3}"]);
    assert_eq!(summary.stats.submitted, 4);
    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.stats.emitted, 3);
    assert!(summary.unresolved.is_empty());
    Ok(())
}

/// Reader that fails every read.
struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other("device went away")))
    }
}

#[tokio::test]
async fn read_error_fails_the_sort() -> TestResult {
    init_tracing();
    let data: &[u8] = b"{\"id\":1}\n";
    let reader = data.chain(BrokenReader);

    let mut out: Vec<u8> = Vec::new();
    let result = with_timeout(sort_json_lines(
        reader,
        &mut out,
        &settings(&ConfigFile::default()),
    ))
    .await;

    assert!(matches!(result, Err(TopostreamError::IoError(_))));
    assert_eq!(String::from_utf8(out)?, "{\"id\":1}\n");
    Ok(())
}

fn temp_file(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn path_arg(file: &NamedTempFile) -> Option<String> {
    Some(file.path().display().to_string())
}

const CYCLIC_INPUT: &str = "{\"id\":1,\"deps\":[2]}\n{\"id\":2,\"deps\":[1]}\n";

#[tokio::test]
async fn run_reports_unresolved_under_fail_policy() -> TestResult {
    init_tracing();
    let input = temp_file(CYCLIC_INPUT)?;
    let config = temp_file("[config]\non_unresolved = \"fail\"\n")?;

    let status = with_timeout(run(CliArgs {
        input: path_arg(&input),
        config: path_arg(&config),
        ..CliArgs::default()
    }))
    .await?;

    assert_eq!(status, RunStatus::Unresolved);
    Ok(())
}

#[tokio::test]
async fn run_completes_under_warn_policy() -> TestResult {
    init_tracing();
    let input = temp_file(CYCLIC_INPUT)?;
    let config = temp_file("[config]\non_unresolved = \"warn\"\n")?;

    let status = with_timeout(run(CliArgs {
        input: path_arg(&input),
        config: path_arg(&config),
        ..CliArgs::default()
    }))
    .await?;

    assert_eq!(status, RunStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn dry_run_does_not_read_input() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent.jsonl");

    let status = with_timeout(run(CliArgs {
        input: Some(missing.display().to_string()),
        dry_run: true,
        ..CliArgs::default()
    }))
    .await?;

    assert_eq!(status, RunStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn run_fails_on_missing_input_file() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent.jsonl");

    let result = with_timeout(run(CliArgs {
        input: Some(missing.display().to_string()),
        ..CliArgs::default()
    }))
    .await;

    assert!(matches!(result, Err(TopostreamError::InputError(_))));
    Ok(())
}
