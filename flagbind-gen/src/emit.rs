//! Assembling rendered artifacts into files and writing them out.
//!
//! Generation is all-or-nothing: [`Package::assemble`] produces every file in
//! memory, and [`Package::write_to`] stages each one next to its target before
//! renaming any of them into place, restoring the previous files if a rename
//! fails.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use proc_macro2::TokenStream;
use tracing::{debug, info};

use crate::error::GenError;

/// Banner placed at the top of every generated file.
pub const GENERATED_BANNER: &str = "// Code generated by flagbind-gen. DO NOT EDIT.\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    FlagSource,
    FlagTest,
    ConfigSource,
    ConfigTest,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::FlagSource,
        ArtifactKind::FlagTest,
        ArtifactKind::ConfigSource,
        ArtifactKind::ConfigTest,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::FlagSource => "flags_generated.rs",
            ArtifactKind::FlagTest => "flags_generated_test.rs",
            ArtifactKind::ConfigSource => "config_generated.rs",
            ArtifactKind::ConfigTest => "config_generated_test.rs",
        }
    }
}

/// One rendered artifact for one type.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub type_key: String,
    pub imports: BTreeSet<String>,
    pub body: TokenStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: &'static str,
    pub contents: String,
}

/// The complete set of generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub files: Vec<GeneratedFile>,
}

impl Package {
    /// Group `artifacts` by kind, in input order, and format each group as one
    /// file. Every kind yields a file even when no type was accepted.
    pub fn assemble(header: &str, artifacts: &[Artifact]) -> Result<Self, GenError> {
        let mut files = Vec::with_capacity(ArtifactKind::ALL.len());
        for kind in ArtifactKind::ALL {
            let group: Vec<&Artifact> = artifacts.iter().filter(|a| a.kind == kind).collect();
            files.push(GeneratedFile {
                name: kind.file_name(),
                contents: format_file(header, kind, &group)?,
            });
        }
        Ok(Self { files })
    }

    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Write every file into `dir`, creating it if needed.
    ///
    /// Files are first written as `<name>.tmp`. Only when all of them are on
    /// disk are they renamed over their targets, each existing target being
    /// moved aside to `<name>.bak` first. If any step fails, renamed files are
    /// replaced by their backups, staged files are removed and the directory
    /// holds exactly what it held before.
    pub fn write_to(&self, dir: &Path) -> Result<(), GenError> {
        fs::create_dir_all(dir).map_err(|source| GenError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        for file in &self.files {
            let target = dir.join(file.name);
            if target.is_dir() {
                return Err(GenError::Io {
                    path: target,
                    source: io::Error::new(io::ErrorKind::IsADirectory, "target is a directory"),
                });
            }
        }

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
        for file in &self.files {
            let target = dir.join(file.name);
            let tmp = dir.join(format!("{}.tmp", file.name));
            if let Err(source) = fs::write(&tmp, &file.contents) {
                discard(&staged);
                let _ = fs::remove_file(&tmp);
                return Err(GenError::Io { path: tmp, source });
            }
            staged.push((tmp, target));
        }

        let mut committed: Vec<(PathBuf, Option<PathBuf>)> = Vec::new();
        for (tmp, target) in &staged {
            match replace(tmp, target) {
                Ok(backup) => committed.push((target.clone(), backup)),
                Err(source) => {
                    roll_back(&committed);
                    discard(&staged);
                    return Err(GenError::Io {
                        path: target.clone(),
                        source,
                    });
                }
            }
        }

        for (target, backup) in &committed {
            if let Some(backup) = backup {
                let _ = fs::remove_file(backup);
            }
            info!(path = %target.display(), "wrote generated file");
        }
        Ok(())
    }

    /// Compare against the files in `dir` without writing.
    pub fn check(&self, dir: &Path) -> Result<(), GenError> {
        for file in &self.files {
            let path = dir.join(file.name);
            match fs::read_to_string(&path) {
                Ok(existing) if existing == file.contents => {
                    debug!(path = %path.display(), "up to date");
                }
                _ => return Err(GenError::Stale(path)),
            }
        }
        Ok(())
    }
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        let _ = fs::remove_file(tmp);
    }
}

/// Rename `tmp` over `target`, returning where the previous target was moved.
fn replace(tmp: &Path, target: &Path) -> io::Result<Option<PathBuf>> {
    let backup = if target.exists() {
        let mut name = target.as_os_str().to_owned();
        name.push(".bak");
        let backup = PathBuf::from(name);
        fs::rename(target, &backup)?;
        Some(backup)
    } else {
        None
    };
    if let Err(e) = fs::rename(tmp, target) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, target);
        }
        return Err(e);
    }
    Ok(backup)
}

fn roll_back(committed: &[(PathBuf, Option<PathBuf>)]) {
    for (target, backup) in committed.iter().rev() {
        match backup {
            Some(backup) => {
                let _ = fs::rename(backup, target);
            }
            None => {
                let _ = fs::remove_file(target);
            }
        }
    }
}

fn format_file(header: &str, kind: ArtifactKind, group: &[&Artifact]) -> Result<String, GenError> {
    let imports: BTreeSet<&String> = group.iter().flat_map(|a| a.imports.iter()).collect();

    let mut tokens = TokenStream::new();
    for path in imports {
        let path: syn::Path = syn::parse_str(path).map_err(|source| GenError::Render {
            artifact: format!("import `{path}` in {}", kind.file_name()),
            source,
        })?;
        tokens.extend(quote::quote! { use #path; });
    }
    for artifact in group {
        tokens.extend(artifact.body.clone());
    }

    let file: syn::File = syn::parse2(tokens).map_err(|source| GenError::Render {
        artifact: kind.file_name().to_string(),
        source,
    })?;

    let mut out = String::new();
    if !header.is_empty() {
        out.push_str(header);
        if !header.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(GENERATED_BANNER);
    out.push('\n');
    out.push_str(&prettyplease::unparse(&file));
    Ok(out)
}
