//! Config file discovery for [`ConfigStore::read_in_config`](crate::ConfigStore::read_in_config).
//!
//! Each [`SearchPath`] resolves to one directory, which is checked for
//! `{dir}/{file_name}`. The list is priority-ascending: files found in later
//! directories are merged over earlier ones. Missing files and unresolvable
//! directories are skipped; other I/O errors are returned.

use std::path::PathBuf;

use tracing::debug;

use crate::error::FlagbindError;

/// Where to look for a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// Resolve a [`SearchPath`] to a directory.
///
/// `app_name` names the platform config directory. Returns `None` when the
/// directory cannot be determined (e.g. no home directory).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Read every `file_name` found along `search_paths`, lowest priority first.
pub fn load_config_files(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Result<Vec<(PathBuf, String)>, FlagbindError> {
    let mut results = Vec::new();
    for sp in search_paths {
        let Some(dir) = resolve_search_path(sp, app_name) else {
            debug!(?sp, "search path does not resolve");
            continue;
        };
        let file_path = dir.join(file_name);
        match std::fs::read_to_string(&file_path) {
            Ok(content) => results.push((file_path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(FlagbindError::IoError {
                    path: file_path,
                    source: e,
                });
            }
        }
    }
    Ok(results)
}
