// src/config/model.rs

use serde::Deserialize;

use crate::engine::SortOptions;
use crate::types::UnresolvedPolicy;

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// max_in_flight = 0
/// output_buffer = 64
/// on_unresolved = "fail"
///
/// [input]
/// id_field = "id"
/// deps_field = "deps"
/// ```
///
/// All sections are optional and have defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub input: InputSection,
}

/// Validated configuration. Obtain one through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub input: InputSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, input: InputSection) -> Self {
        Self { config, input }
    }

    /// Driver options derived from `[config]`.
    pub fn sort_options(&self) -> SortOptions {
        SortOptions::default()
            .with_max_in_flight(self.config.max_in_flight)
            .with_output_buffer(self.config.output_buffer)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(ConfigSection::default(), InputSection::default())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Resolutions allowed in flight before input is paused. `0` means
    /// unbounded.
    #[serde(default)]
    pub max_in_flight: usize,

    /// Capacity of the output channel.
    #[serde(default = "default_output_buffer")]
    pub output_buffer: usize,

    #[serde(default)]
    pub on_unresolved: UnresolvedPolicy,
}

fn default_output_buffer() -> usize {
    SortOptions::DEFAULT_OUTPUT_BUFFER
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_in_flight: 0,
            output_buffer: default_output_buffer(),
            on_unresolved: UnresolvedPolicy::default(),
        }
    }
}

/// `[input]` section: where node info lives in each JSON record.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSection {
    #[serde(default = "default_id_field")]
    pub id_field: String,

    #[serde(default = "default_deps_field")]
    pub deps_field: String,
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_deps_field() -> String {
    "deps".to_string()
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            id_field: default_id_field(),
            deps_field: default_deps_field(),
        }
    }
}
