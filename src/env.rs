//! Environment variable naming and coercion for bound flags and settings.

use crate::cast::FlagValue;
use crate::error::FlagbindError;

/// Derive an environment variable name from a flag name or config key.
///
/// ASCII alphanumerics are uppercased and every other character becomes `_`,
/// so `log-level` and `server.port` map to `LOG_LEVEL` and `SERVER_PORT`.
pub fn derive_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// The variable a flag reads: `env_key` when given, otherwise derived from
/// `name` and prefixed with `{prefix}_` when the store has a prefix.
pub fn effective_key(name: &str, env_key: &str, prefix: Option<&str>) -> String {
    if !env_key.is_empty() {
        return env_key.to_string();
    }
    match prefix {
        Some(p) if !p.is_empty() => format!("{}_{}", derive_key(p), derive_key(name)),
        _ => derive_key(name),
    }
}

pub fn append_env_to_usage(usage: &str, key: &str) -> String {
    if usage.is_empty() {
        format!("[env: {key}]")
    } else {
        format!("{usage} [env: {key}]")
    }
}

/// Convert the raw value of variable `key` into `T`.
pub fn coerce<T: FlagValue>(key: &str, raw: &str) -> Result<T, FlagbindError> {
    T::parse_str(raw).map_err(|source| FlagbindError::EnvValue {
        key: key.to_string(),
        value: raw.to_string(),
        source,
    })
}
