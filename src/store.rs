//! The layered configuration store that flags and settings bind into.
//!
//! A lookup walks the layers from highest to lowest priority and returns the
//! first value found:
//!
//! ```text
//! set()                     explicit overrides
//! changed bound flags       given on the command line
//! environment               bind_env() or automatic_env()
//! config files              merge_config_file(), read_in_config()
//! set_default()             registered defaults
//! unchanged bound flags     the flag's declared default
//! ```
//!
//! Every layer is sparse. The environment is a snapshot taken when the store
//! is created, so tests can supply their own with [`ConfigStore::with_env`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::debug;

use crate::cast::FlagValue;
use crate::env;
use crate::error::FlagbindError;
use crate::file::{self, SearchPath};
use crate::flagset::{FlagRef, FlagSet};
use crate::path::{deep_merge, get_path, leaf_keys, set_path};
use crate::persist;

#[derive(Debug, Default)]
pub struct ConfigStore {
    environment: BTreeMap<String, String>,
    env_prefix: Option<String>,
    automatic_env: bool,
    env_bindings: BTreeMap<String, String>,
    overrides: Table,
    flags: BTreeMap<String, FlagRef>,
    config: Table,
    defaults: Table,
    config_files: Vec<PathBuf>,
}

fn check_key(key: &str) -> Result<(), FlagbindError> {
    if key.is_empty() {
        Err(FlagbindError::EmptyKey)
    } else {
        Ok(())
    }
}

impl ConfigStore {
    /// A store over a snapshot of the process environment.
    pub fn new() -> Self {
        Self::with_env(std::env::vars())
    }

    /// A store over the given environment instead of the process one.
    pub fn with_env(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            environment: vars.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    /// Prefix applied to derived variable names: with prefix `myapp`, key
    /// `port` reads `MYAPP_PORT`.
    pub fn set_env_prefix(&mut self, prefix: impl Into<String>) {
        self.env_prefix = Some(prefix.into());
    }

    /// Consult the derived variable of every key, not only bound ones.
    pub fn automatic_env(&mut self) {
        self.automatic_env = true;
    }

    /// Bind `key` to environment variable `var`, or to the derived name when
    /// `var` is empty.
    pub fn bind_env(&mut self, key: &str, var: &str) -> Result<(), FlagbindError> {
        check_key(key)?;
        let var = env::effective_key(key, var, self.env_prefix());
        debug!(key, var = %var, "bound environment variable");
        self.env_bindings.insert(key.to_string(), var);
        Ok(())
    }

    /// Raw value of `var` in the environment snapshot.
    pub fn env_var(&self, var: &str) -> Option<&str> {
        self.environment.get(var).map(String::as_str)
    }

    /// Override `key` above every other layer.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), FlagbindError> {
        check_key(key)?;
        set_path(&mut self.overrides, key, value.into());
        Ok(())
    }

    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) -> Result<(), FlagbindError> {
        check_key(key)?;
        set_path(&mut self.defaults, key, value.into());
        Ok(())
    }

    /// Read `key` from `flag`: its parsed value once changed, otherwise its
    /// declared default at the lowest priority.
    pub fn bind_flag(&mut self, key: &str, flag: FlagRef) -> Result<(), FlagbindError> {
        check_key(key)?;
        debug!(key, flag = %flag.name(), "bound flag");
        self.flags.insert(key.to_string(), flag);
        Ok(())
    }

    fn env_value(&self, key: &str) -> Option<Value> {
        let var = match self.env_bindings.get(key) {
            Some(var) => var.clone(),
            None if self.automatic_env => env::effective_key(key, "", self.env_prefix()),
            None => return None,
        };
        self.env_var(&var).map(|raw| Value::String(raw.to_string()))
    }

    /// Layers above the unchanged-flag default.
    fn find_above_flag_default(&self, key: &str) -> Option<Value> {
        if let Some(v) = get_path(&self.overrides, key) {
            return Some(v.clone());
        }
        if let Some(flag) = self.flags.get(key)
            && flag.changed()
        {
            return Some(flag.value());
        }
        if let Some(v) = self.env_value(key) {
            return Some(v);
        }
        if let Some(v) = get_path(&self.config, key) {
            return Some(v.clone());
        }
        get_path(&self.defaults, key).cloned()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.find_above_flag_default(key)
            .or_else(|| self.flags.get(key).map(FlagRef::default_value))
    }

    /// Whether `key` has a value from an override, a changed flag, the
    /// environment or a config file. Defaults do not count.
    pub fn is_set(&self, key: &str) -> bool {
        get_path(&self.overrides, key).is_some()
            || self.flags.get(key).is_some_and(FlagRef::changed)
            || self.env_value(key).is_some()
            || get_path(&self.config, key).is_some()
    }

    pub fn get_as<T: FlagValue>(&self, key: &str) -> Result<T, FlagbindError> {
        check_key(key)?;
        let value = self
            .get(key)
            .ok_or_else(|| FlagbindError::KeyNotFound(key.to_string()))?;
        T::from_toml(&value).map_err(|source| FlagbindError::Cast {
            key: key.to_string(),
            source,
        })
    }

    /// Every key known to any layer, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        keys.extend(leaf_keys(&self.overrides));
        keys.extend(leaf_keys(&self.config));
        keys.extend(leaf_keys(&self.defaults));
        keys.extend(self.flags.keys().cloned());
        keys.extend(self.env_bindings.keys().cloned());
        keys.into_iter().collect()
    }

    /// The resolved value of every key, as a nested table.
    pub fn all_settings(&self) -> Table {
        let mut table = Table::new();
        for key in self.all_keys() {
            if let Some(value) = self.get(&key) {
                set_path(&mut table, &key, value);
            }
        }
        table
    }

    /// Deserialize the resolved settings into `T`.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, FlagbindError> {
        Value::Table(self.all_settings())
            .try_into()
            .map_err(FlagbindError::Unmarshal)
    }

    /// Drop every layer and binding. The environment snapshot is kept.
    pub fn reset(&mut self) {
        let environment = std::mem::take(&mut self.environment);
        *self = Self {
            environment,
            ..Self::default()
        };
    }

    /// Merge TOML text into the config-file layer. `origin` names the source
    /// in error messages.
    pub fn merge_toml_str(&mut self, content: &str, origin: &Path) -> Result<(), FlagbindError> {
        let table: Table = toml::from_str(content).map_err(|e| FlagbindError::ParseError {
            path: origin.to_path_buf(),
            source: e,
        })?;
        self.config = deep_merge(std::mem::take(&mut self.config), table);
        Ok(())
    }

    pub fn merge_config_file(&mut self, path: &Path) -> Result<(), FlagbindError> {
        let content = std::fs::read_to_string(path).map_err(|e| FlagbindError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.merge_toml_str(&content, path)?;
        debug!(path = %path.display(), "merged config file");
        self.config_files.push(path.to_path_buf());
        Ok(())
    }

    /// Merge every `file_name` found along `search_paths`; later paths win.
    /// Returns the files that were read.
    pub fn read_in_config(
        &mut self,
        search_paths: &[SearchPath],
        file_name: &str,
        app_name: &str,
    ) -> Result<Vec<PathBuf>, FlagbindError> {
        let mut read = Vec::new();
        for (path, content) in file::load_config_files(search_paths, file_name, app_name)? {
            self.merge_toml_str(&content, &path)?;
            debug!(path = %path.display(), "merged config file");
            self.config_files.push(path.clone());
            read.push(path);
        }
        Ok(read)
    }

    /// Config files merged so far, in merge order.
    pub fn config_files(&self) -> &[PathBuf] {
        &self.config_files
    }

    /// Write the resolved settings into `path`, keeping the comments and
    /// layout of an existing file.
    pub fn write_config(&self, path: &Path) -> Result<(), FlagbindError> {
        persist::write_settings(path, &self.all_settings())
    }

    /// Copy store values into the destinations of `fs`'s bound flags that
    /// were not given on the command line.
    ///
    /// Only layers above the flag's own default are consulted, so a flag with
    /// nothing configured keeps its default.
    pub fn propagate(&self, fs: &FlagSet) -> Result<(), FlagbindError> {
        if !fs.parsed() {
            return Err(FlagbindError::NotParsed);
        }
        for (key, flag) in &self.flags {
            if flag.changed() || !fs.lookup(&flag.name()).is_some_and(|f| f.same(flag)) {
                continue;
            }
            if let Some(value) = self.find_above_flag_default(key) {
                flag.set_value(&value).map_err(|source| FlagbindError::Cast {
                    key: key.clone(),
                    source,
                })?;
                debug!(key = %key, "propagated store value into flag");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use serde::Deserialize;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store(vars: &[(&str, &str)]) -> ConfigStore {
        ConfigStore::with_env(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn missing_key_not_found() {
        let s = store(&[]);
        assert!(matches!(
            s.get_as::<i64>("port"),
            Err(FlagbindError::KeyNotFound(k)) if k == "port"
        ));
        assert!(matches!(s.get_as::<i64>(""), Err(FlagbindError::EmptyKey)));
    }

    #[test]
    fn layer_order() {
        let mut s = store(&[("PORT", "3")]);
        s.set_default("port", 5).unwrap();
        assert_eq!(s.get_as::<i64>("port").unwrap(), 5);

        s.merge_toml_str("port = 4", Path::new("app.toml")).unwrap();
        assert_eq!(s.get_as::<i64>("port").unwrap(), 4);

        s.bind_env("port", "").unwrap();
        assert_eq!(s.get_as::<i64>("port").unwrap(), 3);

        s.set("port", 1).unwrap();
        assert_eq!(s.get_as::<i64>("port").unwrap(), 1);
    }

    #[test]
    fn changed_flag_beats_env_unchanged_flag_is_lowest() {
        let mut s = store(&[("WORKERS", "3")]);
        let mut fs = FlagSet::new("app");
        let d = Destination::new(0i64);
        fs.var_p(&d, "workers", None, 9, "").unwrap();
        s.bind_flag("workers", fs.lookup("workers").unwrap()).unwrap();
        assert_eq!(s.get_as::<i64>("workers").unwrap(), 9);

        s.set_default("workers", 7).unwrap();
        assert_eq!(s.get_as::<i64>("workers").unwrap(), 7);

        s.bind_env("workers", "").unwrap();
        assert_eq!(s.get_as::<i64>("workers").unwrap(), 3);

        fs.parse(["--workers", "2"]).unwrap();
        assert_eq!(s.get_as::<i64>("workers").unwrap(), 2);
    }

    #[test]
    fn automatic_env_uses_prefix() {
        let mut s = store(&[("MYAPP_LOG_LEVEL", "debug"), ("LOG_LEVEL", "warn")]);
        assert!(s.get("log-level").is_none());

        s.automatic_env();
        assert_eq!(s.get_as::<String>("log-level").unwrap(), "warn");

        s.set_env_prefix("myapp");
        assert_eq!(s.get_as::<String>("log-level").unwrap(), "debug");
    }

    #[test]
    fn nested_keys_from_files() {
        let mut s = store(&[]);
        s.merge_toml_str("[server]\ntimeout = \"1m\"\n", Path::new("a.toml"))
            .unwrap();
        assert_eq!(
            s.get_as::<Duration>("server.timeout").unwrap(),
            Duration::from_secs(60)
        );
        assert!(s.is_set("server.timeout"));
    }

    #[test]
    fn cast_error_names_key() {
        let mut s = store(&[]);
        s.set("port", "http").unwrap();
        match s.get_as::<u16>("port") {
            Err(FlagbindError::Cast { key, .. }) => assert_eq!(key, "port"),
            other => panic!("Expected Cast, got: {other:?}"),
        }
    }

    #[test]
    fn defaults_do_not_count_as_set() {
        let mut s = store(&[]);
        s.set_default("debug", false).unwrap();
        assert!(!s.is_set("debug"));
        s.set("debug", true).unwrap();
        assert!(s.is_set("debug"));
    }

    #[test]
    fn reset_keeps_environment_only() {
        let mut s = store(&[("TEST", "1")]);
        s.set_default("a", 1).unwrap();
        s.bind_env("test", "TEST").unwrap();
        assert!(s.get("test").is_some());

        s.reset();
        assert!(s.get("a").is_none());
        assert!(s.get("test").is_none());
        assert!(s.all_keys().is_empty());
        assert_eq!(s.env_var("TEST"), Some("1"));
    }

    #[test]
    fn all_settings_nested() {
        let mut s = store(&[]);
        s.set_default("server.port", 8080).unwrap();
        s.set("name", "svc").unwrap();
        assert_eq!(s.all_keys(), ["name", "server.port"]);
        let all = s.all_settings();
        assert_eq!(all["server"]["port"].as_integer(), Some(8080));
        assert_eq!(all["name"].as_str(), Some("svc"));
    }

    #[test]
    fn unmarshal_into_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Server {
            host: String,
            port: u16,
        }
        #[derive(Debug, Deserialize, PartialEq)]
        struct App {
            server: Server,
        }

        let mut s = store(&[]);
        s.set_default("server.host", "localhost").unwrap();
        s.merge_toml_str("[server]\nport = 9000\n", Path::new("app.toml"))
            .unwrap();
        let app: App = s.unmarshal().unwrap();
        assert_eq!(
            app,
            App {
                server: Server {
                    host: "localhost".into(),
                    port: 9000
                }
            }
        );
    }

    #[test]
    fn parse_error_names_origin() {
        let mut s = store(&[]);
        match s.merge_toml_str("port = ", Path::new("broken.toml")) {
            Err(FlagbindError::ParseError { path, .. }) => {
                assert_eq!(path, Path::new("broken.toml"))
            }
            other => panic!("Expected ParseError, got: {other:?}"),
        }
    }

    #[test]
    fn read_in_config_later_paths_win() {
        let low = TempDir::new().unwrap();
        let high = TempDir::new().unwrap();
        fs::write(low.path().join("app.toml"), "host = \"low\"\nport = 1\n").unwrap();
        fs::write(high.path().join("app.toml"), "host = \"high\"\n").unwrap();

        let mut s = store(&[]);
        let read = s
            .read_in_config(
                &[
                    SearchPath::Path(low.path().to_path_buf()),
                    SearchPath::Path(high.path().to_path_buf()),
                ],
                "app.toml",
                "app",
            )
            .unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(s.config_files().len(), 2);
        assert_eq!(s.get_as::<String>("host").unwrap(), "high");
        assert_eq!(s.get_as::<i64>("port").unwrap(), 1);
    }

    #[test]
    fn merge_config_file_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut s = store(&[]);
        assert!(matches!(
            s.merge_config_file(&dir.path().join("none.toml")),
            Err(FlagbindError::IoError { .. })
        ));
    }

    #[test]
    fn write_config_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.toml");
        fs::write(&path, "# settings\nport = 1\n").unwrap();

        let mut s = store(&[]);
        s.set("port", 2).unwrap();
        s.set_default("server.host", "h").unwrap();
        s.write_config(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# settings"));

        let mut again = store(&[]);
        again.merge_config_file(&path).unwrap();
        assert_eq!(again.get_as::<i64>("port").unwrap(), 2);
        assert_eq!(again.get_as::<String>("server.host").unwrap(), "h");
    }

    #[test]
    fn propagate_requires_parse() {
        let s = store(&[]);
        let fs = FlagSet::new("app");
        assert!(matches!(s.propagate(&fs), Err(FlagbindError::NotParsed)));
    }

    #[test]
    fn propagate_fills_unchanged_flags() {
        let mut s = store(&[]);
        let mut fs = FlagSet::new("app");
        let host = Destination::new(String::new());
        let port = Destination::new(0u16);
        let quiet = Destination::new(false);
        fs.var_p(&host, "host", None, "localhost".to_string(), "").unwrap();
        fs.var_p(&port, "port", None, 80, "").unwrap();
        fs.var_p(&quiet, "quiet", None, false, "").unwrap();
        for name in ["host", "port", "quiet"] {
            s.bind_flag(name, fs.lookup(name).unwrap()).unwrap();
        }
        s.merge_toml_str("host = \"example.org\"\nport = 8080\n", Path::new("app.toml"))
            .unwrap();

        fs.parse(["--port=9090"]).unwrap();
        s.propagate(&fs).unwrap();

        assert_eq!(host.get(), "example.org");
        assert_eq!(port.get(), 9090);
        assert!(!quiet.get());
    }

    #[test]
    fn propagate_reports_bad_value() {
        let mut s = store(&[]);
        let mut fs = FlagSet::new("app");
        let port = Destination::new(0u16);
        fs.var_p(&port, "port", None, 80, "").unwrap();
        s.bind_flag("port", fs.lookup("port").unwrap()).unwrap();
        s.set("port", "http").unwrap();
        fs.parse(Vec::<String>::new()).unwrap();

        assert!(matches!(
            s.propagate(&fs),
            Err(FlagbindError::Cast { key, .. }) if key == "port"
        ));
        assert_eq!(port.get(), 80);
    }
}
