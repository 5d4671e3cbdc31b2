// src/config/validate.rs

use crate::config::model::{ConfigFile, InputSection, RawConfigFile};
use crate::errors::{Result, TopostreamError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TopostreamError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.input))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_input_fields(&cfg.input)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // on_unresolved is typed and checked during deserialization.
    if cfg.config.output_buffer == 0 {
        return Err(TopostreamError::ConfigError(
            "[config].output_buffer must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Field names must be usable as JSON object keys and must not collide.
pub fn validate_input_fields(input: &InputSection) -> Result<()> {
    for (key, value) in [("id_field", &input.id_field), ("deps_field", &input.deps_field)] {
        if value.trim().is_empty() {
            return Err(TopostreamError::ConfigError(format!(
                "[input].{key} must not be empty"
            )));
        }
    }

    if input.id_field == input.deps_field {
        return Err(TopostreamError::ConfigError(format!(
            "[input].id_field and [input].deps_field are both '{}'",
            input.id_field
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnresolvedPolicy;

    fn raw(toml_src: &str) -> RawConfigFile {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = ConfigFile::try_from(raw("")).unwrap();
        assert_eq!(cfg.config.output_buffer, 64);
        assert_eq!(cfg.input.id_field, "id");
        assert_eq!(cfg.sort_options().max_in_flight, None);
        assert_eq!(cfg.config.on_unresolved, UnresolvedPolicy::Fail);
    }

    #[test]
    fn zero_output_buffer_is_rejected() {
        let err = ConfigFile::try_from(raw("[config]\noutput_buffer = 0\n")).unwrap_err();
        assert!(matches!(err, TopostreamError::ConfigError(msg) if msg.contains("output_buffer")));
    }

    #[test]
    fn identical_field_names_are_rejected() {
        let err = ConfigFile::try_from(raw(
            "[input]\nid_field = \"key\"\ndeps_field = \"key\"\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("both 'key'"));
    }

    #[test]
    fn blank_field_name_is_rejected() {
        let err = ConfigFile::try_from(raw("[input]\ndeps_field = \"  \"\n")).unwrap_err();
        assert!(err.to_string().contains("deps_field"));
    }
}
