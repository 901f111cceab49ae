use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("Naming collision: '{first}' and '{second}' both resolve to '{name}'")]
    NamingCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Invalid type '{input}': {reason}")]
    InvalidType { input: String, reason: String },

    #[error("Type expression '{raw}' for '{ty}' is not valid Rust: {source}")]
    InvalidRawType {
        ty: String,
        raw: String,
        source: syn::Error,
    },

    #[error("Failed to render {artifact}: {source}")]
    Render {
        artifact: String,
        source: syn::Error,
    },

    #[error("Failed to parse manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Generated file {0} is out of date; rerun flagbind-gen")]
    Stale(PathBuf),
}
