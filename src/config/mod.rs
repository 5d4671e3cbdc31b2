// src/config/mod.rs

//! Configuration loading and validation for topostream.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: checks applied when turning raw config into `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, ConfigSection, InputSection, RawConfigFile};
pub use validate::validate_input_fields;
