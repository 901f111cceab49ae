use std::path::PathBuf;
use thiserror::Error;

use crate::cast::CastError;

#[derive(Debug, Error)]
pub enum FlagbindError {
    #[error("Flag name must not be empty")]
    EmptyFlagName,

    #[error("Invalid flag name {name:?}: {reason}")]
    InvalidFlagName { name: String, reason: &'static str },

    #[error("Invalid shorthand {shorthand:?} for '--{name}': must be a letter or digit")]
    InvalidShorthand { shorthand: char, name: String },

    #[error("Flag '--{0}' is already defined")]
    DuplicateFlag(String),

    #[error("Shorthand '-{shorthand}' for '--{name}' is already used by '--{existing}'")]
    DuplicateShorthand {
        shorthand: char,
        existing: String,
        name: String,
    },

    #[error("No such flag: '--{0}'")]
    NoSuchFlag(String),

    #[error("Deprecation message for '--{0}' must not be empty")]
    EmptyDeprecationMessage(String),

    #[error("Flag '--{0}' has no shorthand to deprecate")]
    NoShorthand(String),

    #[error("Invalid value {value:?} in environment variable {key}: {source}")]
    EnvValue {
        key: String,
        value: String,
        source: CastError,
    },

    #[error("Invalid value for '--{name}': {source}")]
    InvalidFlagValue { name: String, source: CastError },

    #[error(transparent)]
    Parse(#[from] clap::Error),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Config key must not be empty")]
    EmptyKey,

    #[error("Invalid value for '{key}': {source}")]
    Cast { key: String, source: CastError },

    #[error("Flag set has not been parsed yet")]
    NotParsed,

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot update {path}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("Failed to deserialize settings: {0}")]
    Unmarshal(#[source] toml::de::Error),
}
