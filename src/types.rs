// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What the command line does when a sort ends with unresolved nodes.
///
/// - `Fail`: report the unresolved ids and exit with a non-zero status
///   (default).
/// - `Warn`: report them as a warning and exit successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    #[default]
    Fail,
    Warn,
}

impl FromStr for UnresolvedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(UnresolvedPolicy::Fail),
            "warn" => Ok(UnresolvedPolicy::Warn),
            other => Err(format!(
                "invalid on_unresolved: {other} (expected \"fail\" or \"warn\")"
            )),
        }
    }
}

impl fmt::Display for UnresolvedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedPolicy::Fail => f.write_str("fail"),
            UnresolvedPolicy::Warn => f.write_str("warn"),
        }
    }
}
