//! Conversion between flag text, TOML values and Rust types.
//!
//! [`FlagValue`] is implemented for every type the generator binds. Values
//! arrive either as command-line or environment text ([`FlagValue::parse_str`])
//! or as TOML from config files and defaults ([`FlagValue::from_toml`]).
//!
//! There is deliberately no implementation for `u8`: single bytes are not
//! bound as flags, and `Vec<u8>` is opaque data rather than a list.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use toml::Value;

use crate::duration;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {input:?} to {target}: {reason}")]
pub struct CastError {
    pub input: String,
    pub target: &'static str,
    pub reason: String,
}

impl CastError {
    pub fn new(input: impl Into<String>, target: &'static str, reason: impl fmt::Display) -> Self {
        Self {
            input: input.into(),
            target,
            reason: reason.to_string(),
        }
    }

    fn from_toml(value: &Value, target: &'static str) -> Self {
        Self::new(value.to_string(), target, format!("unexpected {}", value.type_str()))
    }
}

/// How a flag consumes command-line values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `--flag` alone means `true`; `--flag=false` is accepted.
    Switch,
    /// One value; the last occurrence wins.
    Single,
    /// Every occurrence contributes; each may be a comma-separated list.
    Multiple,
}

pub trait FlagValue: Clone + fmt::Debug + PartialEq + 'static {
    fn zero() -> Self;

    fn parse_str(s: &str) -> Result<Self, CastError>;

    fn from_toml(value: &Value) -> Result<Self, CastError>;

    fn to_toml(&self) -> Value;

    /// Textual form, as shown in help output.
    fn render(&self) -> String;

    /// Placeholder shown in help, e.g. `int` or `duration`.
    fn value_name() -> &'static str;

    fn shape() -> Shape {
        Shape::Single
    }

    /// Combine the raw command-line occurrences of one flag.
    fn from_occurrences(values: &[String]) -> Result<Self, CastError> {
        match values.last() {
            Some(last) => Self::parse_str(last),
            None => Ok(Self::zero()),
        }
    }

    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Parse text into any bindable type.
pub fn parse<T: FlagValue>(s: &str) -> Result<T, CastError> {
    T::parse_str(s)
}

/// Convert a TOML value into any bindable type.
pub fn to<T: FlagValue>(value: &Value) -> Result<T, CastError> {
    T::from_toml(value)
}

impl FlagValue for bool {
    fn zero() -> Self {
        false
    }

    fn parse_str(s: &str) -> Result<Self, CastError> {
        match s.trim() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            other => Err(CastError::new(other, "bool", "expected true or false")),
        }
    }

    fn from_toml(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::String(s) => Self::parse_str(s),
            other => Err(CastError::from_toml(other, "bool")),
        }
    }

    fn to_toml(&self) -> Value {
        Value::Boolean(*self)
    }

    fn render(&self) -> String {
        self.to_string()
    }

    fn value_name() -> &'static str {
        "bool"
    }

    fn shape() -> Shape {
        Shape::Switch
    }
}

/// Parse a possibly signed integer with an optional `0x`, `0o` or `0b` prefix.
fn parse_integer(s: &str, target: &'static str) -> Result<i128, CastError> {
    let trimmed = s.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        Some("0o" | "0O") => (8, &unsigned[2..]),
        Some("0b" | "0B") => (2, &unsigned[2..]),
        _ => (10, unsigned),
    };
    if digits.starts_with(['+', '-']) {
        return Err(CastError::new(s, target, "invalid digit found in string"));
    }
    let magnitude = i128::from_str_radix(digits, radix).map_err(|e| CastError::new(s, target, e))?;
    Ok(if negative { -magnitude } else { magnitude })
}

macro_rules! integer_value {
    ($($ty:ty),*) => {$(
        impl FlagValue for $ty {
            fn zero() -> Self {
                0
            }

            fn parse_str(s: &str) -> Result<Self, CastError> {
                let wide = parse_integer(s, stringify!($ty))?;
                <$ty>::try_from(wide)
                    .map_err(|_| CastError::new(s, stringify!($ty), "number out of range"))
            }

            fn from_toml(value: &Value) -> Result<Self, CastError> {
                let target = stringify!($ty);
                match value {
                    Value::Integer(i) => <$ty>::try_from(*i)
                        .map_err(|_| CastError::new(i.to_string(), target, "number out of range")),
                    Value::Float(f) if f.fract() == 0.0 => {
                        let i = *f as i128;
                        if i as f64 != *f {
                            return Err(CastError::new(f.to_string(), target, "number out of range"));
                        }
                        <$ty>::try_from(i)
                            .map_err(|_| CastError::new(f.to_string(), target, "number out of range"))
                    }
                    Value::Boolean(b) => Ok(<$ty>::from(*b)),
                    Value::String(s) => Self::parse_str(s),
                    other => Err(CastError::from_toml(other, target)),
                }
            }

            fn to_toml(&self) -> Value {
                // TOML integers are 64-bit signed; wider values travel as text.
                match i64::try_from(*self) {
                    Ok(i) => Value::Integer(i),
                    Err(_) => Value::String(self.to_string()),
                }
            }

            fn render(&self) -> String {
                self.to_string()
            }

            fn value_name() -> &'static str {
                "int"
            }
        }
    )*};
}

integer_value!(i8, i16, i32, i64, i128, isize, u16, u32, u64, u128, usize);

macro_rules! float_value {
    ($($ty:ty),*) => {$(
        impl FlagValue for $ty {
            fn zero() -> Self {
                0.0
            }

            fn parse_str(s: &str) -> Result<Self, CastError> {
                s.trim()
                    .parse::<$ty>()
                    .map_err(|e| CastError::new(s, stringify!($ty), e))
            }

            fn from_toml(value: &Value) -> Result<Self, CastError> {
                match value {
                    Value::Float(f) => Ok(*f as $ty),
                    Value::Integer(i) => Ok(*i as $ty),
                    Value::String(s) => Self::parse_str(s),
                    other => Err(CastError::from_toml(other, stringify!($ty))),
                }
            }

            fn to_toml(&self) -> Value {
                Value::Float(f64::from(*self))
            }

            fn render(&self) -> String {
                self.to_string()
            }

            fn value_name() -> &'static str {
                "float"
            }
        }
    )*};
}

float_value!(f32, f64);

impl FlagValue for char {
    fn zero() -> Self {
        '\0'
    }

    fn parse_str(s: &str) -> Result<Self, CastError> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(CastError::new(s, "char", "expected exactly one character")),
        }
    }

    fn from_toml(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::String(s) => Self::parse_str(s),
            other => Err(CastError::from_toml(other, "char")),
        }
    }

    fn to_toml(&self) -> Value {
        Value::String(self.to_string())
    }

    fn render(&self) -> String {
        self.to_string()
    }

    fn value_name() -> &'static str {
        "char"
    }
}

impl FlagValue for String {
    fn zero() -> Self {
        String::new()
    }

    fn parse_str(s: &str) -> Result<Self, CastError> {
        Ok(s.to_string())
    }

    fn from_toml(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            Value::Datetime(d) => Ok(d.to_string()),
            other => Err(CastError::from_toml(other, "string")),
        }
    }

    fn to_toml(&self) -> Value {
        Value::String(self.clone())
    }

    fn render(&self) -> String {
        format!("{self:?}")
    }

    fn value_name() -> &'static str {
        "string"
    }
}

/// Types whose TOML form is their textual form.
macro_rules! textual_value {
    ($($ty:ty => $name:literal, $zero:expr);* $(;)?) => {$(
        impl FlagValue for $ty {
            fn zero() -> Self {
                $zero
            }

            fn parse_str(s: &str) -> Result<Self, CastError> {
                s.trim().parse::<$ty>().map_err(|e| CastError::new(s, $name, e))
            }

            fn from_toml(value: &Value) -> Result<Self, CastError> {
                match value {
                    Value::String(s) => Self::parse_str(s),
                    other => Err(CastError::from_toml(other, $name)),
                }
            }

            fn to_toml(&self) -> Value {
                Value::String(self.to_string())
            }

            fn render(&self) -> String {
                self.to_string()
            }

            fn value_name() -> &'static str {
                $name
            }
        }
    )*};
}

textual_value! {
    IpAddr => "ip", IpAddr::from([0, 0, 0, 0]);
    SocketAddr => "addr", SocketAddr::from(([0, 0, 0, 0], 0));
}

impl FlagValue for PathBuf {
    fn zero() -> Self {
        PathBuf::new()
    }

    fn parse_str(s: &str) -> Result<Self, CastError> {
        Ok(PathBuf::from(s))
    }

    fn from_toml(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::String(s) => Ok(PathBuf::from(s)),
            other => Err(CastError::from_toml(other, "path")),
        }
    }

    fn to_toml(&self) -> Value {
        Value::String(self.to_string_lossy().into_owned())
    }

    fn render(&self) -> String {
        self.display().to_string()
    }

    fn value_name() -> &'static str {
        "path"
    }
}

impl FlagValue for Duration {
    fn zero() -> Self {
        Duration::ZERO
    }

    fn parse_str(s: &str) -> Result<Self, CastError> {
        duration::parse(s).map_err(|reason| CastError::new(s, "duration", reason))
    }

    fn from_toml(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::String(s) => Self::parse_str(s),
            Value::Integer(secs) if *secs >= 0 => Ok(Duration::from_secs(*secs as u64)),
            Value::Float(secs) if *secs >= 0.0 && secs.is_finite() => {
                Duration::try_from_secs_f64(*secs)
                    .map_err(|e| CastError::new(secs.to_string(), "duration", e))
            }
            other => Err(CastError::from_toml(other, "duration")),
        }
    }

    fn to_toml(&self) -> Value {
        Value::String(duration::format(*self))
    }

    fn render(&self) -> String {
        duration::format(*self)
    }

    fn value_name() -> &'static str {
        "duration"
    }
}

impl<T: FlagValue> FlagValue for Vec<T> {
    fn zero() -> Self {
        Vec::new()
    }

    fn parse_str(s: &str) -> Result<Self, CastError> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);
        if inner.trim().is_empty() {
            return Ok(Vec::new());
        }
        inner.split(',').map(|item| T::parse_str(item.trim())).collect()
    }

    fn from_toml(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::Array(items) => items.iter().map(T::from_toml).collect(),
            Value::String(s) => Self::parse_str(s),
            other => Err(CastError::from_toml(other, "list")),
        }
    }

    fn to_toml(&self) -> Value {
        Value::Array(self.iter().map(T::to_toml).collect())
    }

    fn render(&self) -> String {
        let items: Vec<String> = self.iter().map(T::render).collect();
        format!("[{}]", items.join(","))
    }

    fn value_name() -> &'static str {
        "list"
    }

    fn shape() -> Shape {
        Shape::Multiple
    }

    fn from_occurrences(values: &[String]) -> Result<Self, CastError> {
        let mut out = Vec::new();
        for value in values {
            out.extend(Self::parse_str(value)?);
        }
        Ok(out)
    }
}
