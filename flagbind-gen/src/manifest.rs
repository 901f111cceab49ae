//! The `flagbind.toml` manifest read by the `flagbind-gen` binary.
//!
//! ```toml
//! output_dir = "src/generated"
//! runtime = "flagbind"
//! output_module = "crate::generated"
//! header_file = "hack/boilerplate.txt"
//! types = ["bool", "Vec<String>", "std::time::Duration", "crate::Port"]
//!
//! [aliases]
//! "crate::Port" = "u16"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::descriptor::TypeDescriptor;
use crate::error::GenError;

fn default_runtime() -> String {
    "flagbind".into()
}

fn default_output_module() -> String {
    "crate".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Directory the generated files are written into.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Path under which the runtime crate is reachable from the generated code.
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Module the generated files are included into.
    #[serde(default = "default_output_module")]
    pub output_module: String,
    /// File whose contents are prepended to every generated file.
    #[serde(default)]
    pub header_file: Option<PathBuf>,
    /// Candidate types, in Rust type syntax. An empty list means the standard set.
    #[serde(default)]
    pub types: Vec<String>,
    /// Alias paths and the type syntax they stand for.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, GenError> {
        let content = std::fs::read_to_string(path).map_err(|source| GenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, GenError> {
        toml::from_str(content).map_err(|source| GenError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse the listed types, falling back to [`crate::descriptor::standard`].
    pub fn descriptors(&self) -> Result<Vec<TypeDescriptor>, GenError> {
        if self.types.is_empty() {
            return Ok(crate::descriptor::standard());
        }
        self.types
            .iter()
            .map(|t| TypeDescriptor::parse(t, &self.aliases))
            .collect()
    }
}
