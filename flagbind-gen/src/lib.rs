//! Code generator for [flagbind](https://docs.rs/flagbind) bindings.
//!
//! Given a list of candidate types, `flagbind-gen` decides which of them get
//! bindings, names them, and renders four Rust files:
//!
//! | File                       | Contents                                         |
//! |----------------------------|--------------------------------------------------|
//! | `flags_generated.rs`       | one `<Type>Flag` wrapper per type, `impl Flag`   |
//! | `flags_generated_test.rs`  | one parse-and-bind test per flag wrapper         |
//! | `config_generated.rs`      | `<Type>Setting`, `get_<type>`, `set_default_<type>` |
//! | `config_generated_test.rs` | one bind-and-read test per setting               |
//!
//! Generation is a pure function of its inputs. The same types and options
//! always produce byte-identical output, and nothing touches the filesystem
//! until [`Package::write_to`] is called.
//!
//! # Which types are accepted
//!
//! - Builtins and aliases, except the byte type `u8`.
//! - `Vec<T>` unless `T` is a byte type.
//! - The records in [`filter::ALLOWED_RECORDS`].
//!
//! Everything else (maps, references, arrays, tuples, other generics) is
//! skipped and logged at debug level.
//!
//! # Usage from a build script
//!
//! ```ignore
//! fn main() {
//!     let out = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap());
//!     let package = flagbind_gen::generate(
//!         &flagbind_gen::descriptor::standard(),
//!         &flagbind_gen::GenerateOptions::default(),
//!     )
//!     .unwrap();
//!     package.write_to(&out).unwrap();
//! }
//! ```
//!
//! The `flagbind-gen` binary does the same from a `flagbind.toml` manifest
//! (see [`manifest::Manifest`]) and can `--check` that checked-in files are
//! current.

pub mod binding;
pub mod descriptor;
pub mod emit;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod naming;
pub mod template;

use std::collections::BTreeSet;

use tracing::debug;

pub use descriptor::TypeDescriptor;
pub use emit::{ArtifactKind, Package};
pub use error::GenError;

use binding::BindingSpec;
use naming::NameSystems;
use template::{RenderContext, RUNTIME_NAMES};

/// Where the generated code lives and how it reaches the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Path of the runtime crate as seen from the generated code.
    pub runtime_path: String,
    /// Module the generated files are included into.
    pub output_module: String,
    /// Text prepended to every file, typically a license header.
    pub header: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            runtime_path: "flagbind".into(),
            output_module: "crate".into(),
            header: String::new(),
        }
    }
}

/// Run the full pipeline over `types` and return the rendered files.
///
/// Repeated occurrences of the same type are generated once. Any naming
/// collision aborts the run before a single file is produced.
pub fn generate(types: &[TypeDescriptor], options: &GenerateOptions) -> Result<Package, GenError> {
    let mut names = NameSystems::new(&options.output_module, RUNTIME_NAMES.iter().copied());
    let ctx = RenderContext::new(options);

    let mut seen = BTreeSet::new();
    let mut specs = Vec::new();
    for ty in types {
        if !filter::accept(ty) {
            debug!(ty = %ty.key(), "skipping type without a binding");
            continue;
        }
        if !seen.insert(ty.key()) {
            continue;
        }
        let resolved = names.resolve(ty)?;
        specs.push(BindingSpec::new(ty, resolved)?);
    }

    let mut artifacts = Vec::with_capacity(specs.len() * ArtifactKind::ALL.len());
    for kind in ArtifactKind::ALL {
        for spec in &specs {
            artifacts.push(template::render(&ctx, spec, kind)?);
        }
    }
    debug!(types = specs.len(), "rendered bindings");

    Package::assemble(&options.header, &artifacts)
}
