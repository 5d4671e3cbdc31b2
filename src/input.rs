// src/input.rs

//! Newline-delimited JSON input for the command line.
//!
//! Each non-blank line is one payload. The payload is kept as raw text so it
//! can be written out unchanged; the resolver parses it to find the node id
//! and dependencies.

use std::fmt;
use std::io;
use std::str::Utf8Error;

use anyhow::Context;
use futures::stream::{self, Stream};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::oneshot;
use tracing::error;

use crate::errors::{Result, TopostreamError};
use crate::graph::NodeInfo;
use crate::resolve::Resolver;

/// Node id taken from a JSON record.
///
/// Holds the compact JSON text of the id value, so `1` and `"1"` are
/// different ids, as are `1` and `1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonKey(String);

impl JsonKey {
    /// Ids must be JSON strings or numbers.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(_) | Value::Number(_) => Ok(JsonKey(value.to_string())),
            other => Err(TopostreamError::InputError(format!(
                "ids must be strings or numbers, got {other}"
            ))),
        }
    }

    pub fn as_json(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One input record, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    pub line_no: usize,
    /// Line contents without the line terminator. Lossily decoded when the
    /// line is not valid UTF-8.
    pub text: String,
    /// Set when the raw bytes were not valid UTF-8. Such a line always fails
    /// resolution.
    pub utf8_error: Option<Utf8Error>,
}

impl InputLine {
    pub fn new(line_no: usize, text: impl Into<String>) -> Self {
        Self {
            line_no,
            text: text.into(),
            utf8_error: None,
        }
    }

    /// Decode one raw line. Returns `None` for blank lines.
    fn decode(line_no: usize, mut raw: Vec<u8>) -> Option<Self> {
        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        }

        match String::from_utf8(raw) {
            Ok(text) if text.trim().is_empty() => None,
            Ok(text) => Some(Self::new(line_no, text)),
            Err(err) => Some(Self {
                line_no,
                text: String::from_utf8_lossy(err.as_bytes()).into_owned(),
                utf8_error: Some(err.utf8_error()),
            }),
        }
    }
}

/// Reports whether a [`json_lines`] stream ended because the reader failed.
///
/// Check it after the stream has been consumed or dropped.
#[derive(Debug)]
pub struct ReadStatus {
    failure: oneshot::Receiver<io::Error>,
}

impl ReadStatus {
    /// `Err` if the reader failed before end of input.
    pub fn check(mut self) -> Result<()> {
        match self.failure.try_recv() {
            Ok(err) => Err(TopostreamError::IoError(err)),
            Err(_) => Ok(()),
        }
    }
}

struct LineReader<R> {
    reader: BufReader<R>,
    line_no: usize,
    failure: Option<oneshot::Sender<io::Error>>,
}

/// Read non-blank lines from `reader` until EOF.
///
/// A line that is not valid UTF-8 is still yielded, flagged, so it surfaces
/// as a per-record failure. Any other read error ends the stream and is
/// reported through the returned [`ReadStatus`].
pub fn json_lines<R>(reader: R) -> (impl Stream<Item = InputLine> + Send, ReadStatus)
where
    R: AsyncRead + Unpin + Send,
{
    let (tx, rx) = oneshot::channel();
    let state = LineReader {
        reader: BufReader::new(reader),
        line_no: 0,
        failure: Some(tx),
    };

    let lines = stream::unfold(state, |mut state| async move {
        loop {
            let mut raw = Vec::new();
            match state.reader.read_until(b'\n', &mut raw).await {
                Ok(0) => return None,
                Ok(_) => {
                    state.line_no += 1;
                    if let Some(line) = InputLine::decode(state.line_no, raw) {
                        return Some((line, state));
                    }
                }
                Err(err) => {
                    error!(line_no = state.line_no + 1, error = %err, "failed to read input");
                    if let Some(tx) = state.failure.take() {
                        let _ = tx.send(err);
                    }
                    return None;
                }
            }
        }
    });

    (lines, ReadStatus { failure: rx })
}

/// Extract node info from one JSON object.
///
/// `deps_field` may be absent or `null`, meaning no dependencies.
pub fn parse_node_info(text: &str, id_field: &str, deps_field: &str) -> Result<NodeInfo<JsonKey>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(mut record) = value else {
        return Err(TopostreamError::InputError(
            "expected a JSON object".to_string(),
        ));
    };

    let id = match record.get(id_field) {
        Some(id) => JsonKey::from_value(id)?,
        None => {
            return Err(TopostreamError::InputError(format!(
                "missing id field '{id_field}'"
            )));
        }
    };

    let deps = match record.remove(deps_field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(JsonKey::from_value)
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(TopostreamError::InputError(format!(
                "field '{deps_field}' must be an array, got {other}"
            )));
        }
    };

    Ok(NodeInfo { id, deps })
}

/// Synchronous resolver reading ids and dependencies from JSON lines.
pub fn json_resolver(id_field: &str, deps_field: &str) -> Resolver<InputLine, JsonKey> {
    let id_field = id_field.to_string();
    let deps_field = deps_field.to_string();

    Resolver::sync(move |line: &InputLine| {
        let info = match line.utf8_error {
            Some(err) => Err(TopostreamError::InputError(format!(
                "line is not valid UTF-8: {err}"
            ))),
            None => parse_node_info(&line.text, &id_field, &deps_field),
        };
        info.with_context(|| format!("line {}", line.line_no))
    })
}
