//! A named set of typed command-line flags, parsed with clap.
//!
//! Flags are declared one at a time with [`FlagSet::var_p`], each bound to a
//! [`Destination`] that receives the default immediately and the parsed value
//! after [`FlagSet::parse`]. Metadata (deprecation, hiding, annotations) is
//! attached after declaration, mirroring the order generated bindings use.
//!
//! Parsing builds a fresh `clap::Command` from the declared flags:
//!
//! | Shape      | Accepted forms                              |
//! |------------|---------------------------------------------|
//! | switch     | `--name`, `--name=false`, `-n`, `-n=true`   |
//! | single     | `--name v`, `--name=v`, `-n v`, `-n=v`      |
//! | multiple   | repeated occurrences, each comma-separated  |

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, Command};
use toml::Value;
use tracing::{debug, warn};

use crate::cast::{CastError, FlagValue, Shape};
use crate::destination::Destination;
use crate::error::FlagbindError;

/// Id of the positional catch-all. It contains whitespace, which
/// [`FlagSet::var_p`] rejects in flag names.
const POSITIONAL: &str = "[positional args]";

fn validate_name(name: &str) -> Result<(), FlagbindError> {
    if name.is_empty() {
        return Err(FlagbindError::EmptyFlagName);
    }
    let reason = if name.starts_with('-') {
        "must not start with '-'"
    } else if name.contains('=') {
        "must not contain '='"
    } else if name.contains(char::is_whitespace) {
        "must not contain whitespace"
    } else {
        return Ok(());
    };
    Err(FlagbindError::InvalidFlagName {
        name: name.to_string(),
        reason,
    })
}

/// Everything known about a declared flag apart from its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagInfo {
    pub name: String,
    pub shorthand: Option<char>,
    pub usage: String,
    /// Rendered default, `None` when the default is the type's zero value.
    pub default: Option<String>,
    pub value_name: &'static str,
    pub deprecated: Option<String>,
    pub shorthand_deprecated: Option<String>,
    pub hidden: bool,
    pub annotations: BTreeMap<String, Vec<String>>,
}

trait ErasedValue {
    fn shape(&self) -> Shape;
    fn set_occurrences(&self, values: &[String]) -> Result<(), CastError>;
    fn set_toml(&self, value: &Value) -> Result<(), CastError>;
    fn current(&self) -> Value;
    fn default(&self) -> Value;
}

struct Bound<T> {
    destination: Destination<T>,
    default: T,
}

impl<T: FlagValue> ErasedValue for Bound<T> {
    fn shape(&self) -> Shape {
        T::shape()
    }

    fn set_occurrences(&self, values: &[String]) -> Result<(), CastError> {
        self.destination.set(T::from_occurrences(values)?);
        Ok(())
    }

    fn set_toml(&self, value: &Value) -> Result<(), CastError> {
        self.destination.set(T::from_toml(value)?);
        Ok(())
    }

    fn current(&self) -> Value {
        self.destination.with(T::to_toml)
    }

    fn default(&self) -> Value {
        self.default.to_toml()
    }
}

struct FlagCore {
    info: RefCell<FlagInfo>,
    value: Box<dyn ErasedValue>,
    changed: Cell<bool>,
}

/// A shared handle to a declared flag.
///
/// Handles stay valid after the flag set is dropped, which is how a
/// [`ConfigStore`](crate::ConfigStore) keeps reading bound flags.
#[derive(Clone)]
pub struct FlagRef(Rc<FlagCore>);

impl FlagRef {
    pub fn name(&self) -> String {
        self.0.info.borrow().name.clone()
    }

    pub fn info(&self) -> FlagInfo {
        self.0.info.borrow().clone()
    }

    /// Whether the flag was given on the command line.
    pub fn changed(&self) -> bool {
        self.0.changed.get()
    }

    /// The destination's current value.
    pub fn value(&self) -> Value {
        self.0.value.current()
    }

    /// The value the flag was declared with.
    pub fn default_value(&self) -> Value {
        self.0.value.default()
    }

    /// Overwrite the destination without marking the flag changed.
    pub fn set_value(&self, value: &Value) -> Result<(), CastError> {
        self.0.value.set_toml(value)
    }

    pub(crate) fn same(&self, other: &FlagRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for FlagRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagRef")
            .field("name", &self.0.info.borrow().name)
            .field("changed", &self.0.changed.get())
            .field("value", &self.0.value.current())
            .finish()
    }
}

#[derive(Debug)]
pub struct FlagSet {
    name: String,
    flags: Vec<FlagRef>,
    shorthands: BTreeMap<char, String>,
    parsed: bool,
    args: Vec<String>,
    warnings: Vec<String>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Vec::new(),
            shorthands: BTreeMap::new(),
            parsed: false,
            args: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a flag bound to `destination`, which is set to `value` at once.
    pub fn var_p<T: FlagValue>(
        &mut self,
        destination: &Destination<T>,
        name: &str,
        shorthand: Option<char>,
        value: T,
        usage: &str,
    ) -> Result<(), FlagbindError> {
        validate_name(name)?;
        if let Some(c) = shorthand
            && !c.is_alphanumeric()
        {
            return Err(FlagbindError::InvalidShorthand {
                shorthand: c,
                name: name.to_string(),
            });
        }
        if self.lookup(name).is_some() {
            return Err(FlagbindError::DuplicateFlag(name.to_string()));
        }
        if let Some(c) = shorthand
            && let Some(existing) = self.shorthands.get(&c)
        {
            return Err(FlagbindError::DuplicateShorthand {
                shorthand: c,
                existing: existing.clone(),
                name: name.to_string(),
            });
        }

        destination.set(value.clone());
        let info = FlagInfo {
            name: name.to_string(),
            shorthand,
            usage: usage.to_string(),
            default: (!value.is_zero()).then(|| value.render()),
            value_name: T::value_name(),
            deprecated: None,
            shorthand_deprecated: None,
            hidden: false,
            annotations: BTreeMap::new(),
        };
        let core = FlagCore {
            info: RefCell::new(info),
            value: Box::new(Bound {
                destination: destination.clone(),
                default: value,
            }),
            changed: Cell::new(false),
        };

        if let Some(c) = shorthand {
            self.shorthands.insert(c, name.to_string());
        }
        self.flags.push(FlagRef(Rc::new(core)));
        debug!(set = %self.name, flag = name, "registered flag");
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<&FlagRef, FlagbindError> {
        self.flags
            .iter()
            .find(|f| f.0.info.borrow().name == name)
            .ok_or_else(|| FlagbindError::NoSuchFlag(name.to_string()))
    }

    pub fn mark_deprecated(&mut self, name: &str, message: &str) -> Result<(), FlagbindError> {
        let flag = self.entry(name)?;
        if message.is_empty() {
            return Err(FlagbindError::EmptyDeprecationMessage(name.to_string()));
        }
        flag.0.info.borrow_mut().deprecated = Some(message.to_string());
        Ok(())
    }

    pub fn mark_shorthand_deprecated(
        &mut self,
        name: &str,
        message: &str,
    ) -> Result<(), FlagbindError> {
        let flag = self.entry(name)?;
        if message.is_empty() {
            return Err(FlagbindError::EmptyDeprecationMessage(name.to_string()));
        }
        let mut info = flag.0.info.borrow_mut();
        if info.shorthand.is_none() {
            return Err(FlagbindError::NoShorthand(name.to_string()));
        }
        info.shorthand_deprecated = Some(message.to_string());
        Ok(())
    }

    pub fn mark_hidden(&mut self, name: &str) -> Result<(), FlagbindError> {
        self.entry(name)?.0.info.borrow_mut().hidden = true;
        Ok(())
    }

    pub fn set_annotation(
        &mut self,
        name: &str,
        key: &str,
        values: Vec<String>,
    ) -> Result<(), FlagbindError> {
        self.entry(name)?
            .0
            .info
            .borrow_mut()
            .annotations
            .insert(key.to_string(), values);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<FlagRef> {
        self.entry(name).ok().cloned()
    }

    pub fn flag(&self, name: &str) -> Option<FlagInfo> {
        self.entry(name).ok().map(FlagRef::info)
    }

    /// Names of all declared flags, in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.flags.iter().map(FlagRef::name).collect()
    }

    pub fn changed(&self, name: &str) -> bool {
        self.entry(name).map(FlagRef::changed).unwrap_or(false)
    }

    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Positional arguments left after parsing.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Deprecation notices produced by the last parse.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Add the flags of `other` that this set does not declare yet.
    ///
    /// Merged flags share their destination and changed state with `other`.
    pub fn merge(&mut self, other: &FlagSet) -> Result<(), FlagbindError> {
        for flag in &other.flags {
            let info = flag.info();
            if let Ok(existing) = self.entry(&info.name) {
                if !existing.same(flag) {
                    debug!(set = %self.name, flag = %info.name, "keeping local flag over inherited one");
                }
                continue;
            }
            if let Some(c) = info.shorthand {
                if let Some(existing) = self.shorthands.get(&c) {
                    return Err(FlagbindError::DuplicateShorthand {
                        shorthand: c,
                        existing: existing.clone(),
                        name: info.name,
                    });
                }
                self.shorthands.insert(c, info.name.clone());
            }
            self.flags.push(flag.clone());
        }
        Ok(())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.name.clone())
            .no_binary_name(true)
            .args_override_self(true)
            .disable_help_flag(true)
            .disable_version_flag(true);

        for flag in &self.flags {
            let info = flag.info();
            let mut help = info.usage.clone();
            if let Some(default) = &info.default {
                help.push_str(&format!(" (default {default})"));
            }
            if let Some(message) = &info.deprecated {
                help.push_str(&format!(" (DEPRECATED: {message})"));
            }

            let mut arg = Arg::new(info.name.clone())
                .long(info.name.clone())
                .help(help)
                .hide(info.hidden);
            if let Some(c) = info.shorthand {
                arg = arg.short(c);
            }
            arg = match flag.0.value.shape() {
                Shape::Switch => arg
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true")
                    .action(ArgAction::Set),
                Shape::Single => arg
                    .value_name(info.value_name)
                    .allow_negative_numbers(true)
                    .action(ArgAction::Set),
                Shape::Multiple => arg
                    .value_name(info.value_name)
                    .allow_negative_numbers(true)
                    .action(ArgAction::Append),
            };
            cmd = cmd.arg(arg);
        }

        cmd.arg(
            Arg::new(POSITIONAL)
                .num_args(1..)
                .action(ArgAction::Append)
                .hide(true),
        )
    }

    /// Parse `args` (without the program name) into the bound destinations.
    pub fn parse<I, S>(&mut self, args: I) -> Result<(), FlagbindError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let matches = self.command().try_get_matches_from(&args)?;

        let mut warnings = Vec::new();
        for flag in &self.flags {
            let info = flag.info();
            if matches.value_source(&info.name) != Some(ValueSource::CommandLine) {
                continue;
            }
            let raw: Vec<String> = matches
                .get_raw(&info.name)
                .map(|values| {
                    values
                        .map(|v| v.to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default();
            flag.0
                .value
                .set_occurrences(&raw)
                .map_err(|source| FlagbindError::InvalidFlagValue {
                    name: info.name.clone(),
                    source,
                })?;
            flag.0.changed.set(true);

            if let Some(message) = &info.deprecated {
                warnings.push(format!("Flag --{} has been deprecated, {message}", info.name));
            }
            if let (Some(c), Some(message)) = (info.shorthand, &info.shorthand_deprecated)
                && shorthand_used(&args, c)
            {
                warnings.push(format!("Flag shorthand -{c} has been deprecated, {message}"));
            }
        }

        self.args = matches
            .get_raw(POSITIONAL)
            .map(|values| {
                values
                    .map(|v| v.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        for message in &warnings {
            warn!(set = %self.name, "{message}");
        }
        self.warnings = warnings;
        self.parsed = true;
        Ok(())
    }

    /// Render help for the visible flags.
    pub fn usage(&self) -> String {
        self.command().render_help().to_string()
    }
}

/// Whether `-c` appeared in a short-flag cluster before any `--` terminator.
fn shorthand_used(args: &[String], c: char) -> bool {
    for arg in args {
        if arg == "--" {
            break;
        }
        if arg.starts_with("--") {
            continue;
        }
        if let Some(cluster) = arg.strip_prefix('-') {
            let cluster = cluster.split('=').next().unwrap_or_default();
            if cluster.contains(c) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn declaration_sets_default() {
        let mut fs = FlagSet::new("app");
        let port = Destination::new(0u16);
        fs.var_p(&port, "port", Some('p'), 8080, "listen port").unwrap();
        assert_eq!(port.get(), 8080);
        assert!(!fs.changed("port"));
        assert_eq!(fs.flag("port").unwrap().default.as_deref(), Some("8080"));
    }

    #[test]
    fn empty_name_rejected() {
        let mut fs = FlagSet::new("app");
        let d = Destination::new(false);
        assert!(matches!(
            fs.var_p(&d, "", None, false, ""),
            Err(FlagbindError::EmptyFlagName)
        ));
    }

    #[test]
    fn malformed_names_rejected_at_declaration() {
        let mut fs = FlagSet::new("app");
        let d = Destination::new(false);
        for name in ["-x", "--x", "a=b", "two words", "tab\tname"] {
            match fs.var_p(&d, name, None, false, "") {
                Err(FlagbindError::InvalidFlagName { name: got, .. }) => assert_eq!(got, name),
                other => panic!("Expected InvalidFlagName for {name:?}, got: {other:?}"),
            }
        }
        assert!(fs.names().is_empty());
        fs.parse(Vec::<String>::new()).unwrap();
    }

    #[test]
    fn malformed_shorthand_rejected_at_declaration() {
        let mut fs = FlagSet::new("app");
        let d = Destination::new(false);
        for c in ['-', '=', ' ', '?'] {
            assert!(matches!(
                fs.var_p(&d, "force", Some(c), false, ""),
                Err(FlagbindError::InvalidShorthand { shorthand, .. }) if shorthand == c
            ));
        }
        assert!(fs.lookup("force").is_none());
        fs.var_p(&d, "force", Some('f'), false, "").unwrap();
    }

    #[test]
    fn bracketed_name_does_not_clash_with_positionals() {
        let mut fs = FlagSet::new("app");
        let d = Destination::new(String::new());
        fs.var_p(&d, "[args]", None, String::new(), "").unwrap();
        fs.parse(["--[args]=x", "run"]).unwrap();
        assert_eq!(d.get(), "x");
        assert_eq!(fs.args(), ["run"]);
        assert!(fs.usage().contains("--[args]"));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut fs = FlagSet::new("app");
        let d = Destination::new(0i64);
        fs.var_p(&d, "count", None, 0, "").unwrap();
        match fs.var_p(&d, "count", None, 1, "") {
            Err(FlagbindError::DuplicateFlag(name)) => assert_eq!(name, "count"),
            other => panic!("Expected DuplicateFlag, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_shorthand_rejected() {
        let mut fs = FlagSet::new("app");
        let a = Destination::new(false);
        let b = Destination::new(false);
        fs.var_p(&a, "verbose", Some('v'), false, "").unwrap();
        assert!(matches!(
            fs.var_p(&b, "version", Some('v'), false, ""),
            Err(FlagbindError::DuplicateShorthand { shorthand: 'v', .. })
        ));
    }

    #[test]
    fn bool_shorthand_with_equals() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(false);
        fs.var_p(&d, "test", Some('t'), false, "").unwrap();
        fs.parse(["-t=true"]).unwrap();
        assert!(d.get());
        assert!(fs.changed("test"));
    }

    #[test]
    fn bare_switch_means_true() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(false);
        fs.var_p(&d, "verbose", None, false, "").unwrap();
        fs.parse(["--verbose"]).unwrap();
        assert!(d.get());
    }

    #[test]
    fn switch_can_be_turned_off() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(true);
        fs.var_p(&d, "color", None, true, "").unwrap();
        fs.parse(["--color=false"]).unwrap();
        assert!(!d.get());
    }

    #[test]
    fn single_value_last_wins() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(0i32);
        fs.var_p(&d, "level", Some('l'), 0, "").unwrap();
        fs.parse(["--level", "1", "-l=-3"]).unwrap();
        assert_eq!(d.get(), -3);
    }

    #[test]
    fn sequence_accumulates() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(Vec::<String>::new());
        fs.var_p(&d, "tag", None, Vec::new(), "").unwrap();
        fs.parse(["--tag=a,b", "--tag", "c"]).unwrap();
        assert_eq!(d.get(), vec!["a", "b", "c"]);
    }

    #[test]
    fn positional_args_collected() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(Duration::ZERO);
        fs.var_p(&d, "timeout", None, Duration::ZERO, "").unwrap();
        fs.parse(["--timeout=1m", "run", "now"]).unwrap();
        assert_eq!(d.get(), Duration::from_secs(60));
        assert_eq!(fs.args(), ["run", "now"]);
        assert!(fs.parsed());
    }

    #[test]
    fn invalid_value_reports_flag() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(0u16);
        fs.var_p(&d, "port", None, 0, "").unwrap();
        match fs.parse(["--port=http"]) {
            Err(FlagbindError::InvalidFlagValue { name, .. }) => assert_eq!(name, "port"),
            other => panic!("Expected InvalidFlagValue, got: {other:?}"),
        }
    }

    #[test]
    fn unknown_flag_is_parse_error() {
        let mut fs = FlagSet::new("dev");
        assert!(matches!(
            fs.parse(["--nope"]),
            Err(FlagbindError::Parse(_))
        ));
    }

    #[test]
    fn deprecated_flag_warns_and_shows_in_usage() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(String::new());
        fs.var_p(&d, "old-flag", None, String::new(), "legacy").unwrap();
        fs.mark_deprecated("old-flag", "use --new-flag").unwrap();

        assert!(fs.usage().contains("(DEPRECATED: use --new-flag)"));

        fs.parse(["--old-flag=x"]).unwrap();
        assert_eq!(d.get(), "x");
        assert_eq!(
            fs.warnings(),
            ["Flag --old-flag has been deprecated, use --new-flag"]
        );
    }

    #[test]
    fn deprecated_shorthand_warns_only_when_used() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(false);
        fs.var_p(&d, "force", Some('f'), false, "").unwrap();
        fs.mark_shorthand_deprecated("force", "use --force").unwrap();

        fs.parse(["--force"]).unwrap();
        assert!(fs.warnings().is_empty());

        fs.parse(["-f"]).unwrap();
        assert_eq!(fs.warnings(), ["Flag shorthand -f has been deprecated, use --force"]);
    }

    #[test]
    fn deprecation_needs_message_and_shorthand() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(false);
        fs.var_p(&d, "force", None, false, "").unwrap();
        assert!(matches!(
            fs.mark_deprecated("force", ""),
            Err(FlagbindError::EmptyDeprecationMessage(_))
        ));
        assert!(matches!(
            fs.mark_shorthand_deprecated("force", "gone"),
            Err(FlagbindError::NoShorthand(_))
        ));
        assert!(matches!(
            fs.mark_hidden("missing"),
            Err(FlagbindError::NoSuchFlag(_))
        ));
    }

    #[test]
    fn hidden_flags_left_out_of_usage() {
        let mut fs = FlagSet::new("dev");
        let a = Destination::new(false);
        let b = Destination::new(false);
        fs.var_p(&a, "visible", None, false, "shown").unwrap();
        fs.var_p(&b, "secret", None, false, "not shown").unwrap();
        fs.mark_hidden("secret").unwrap();

        let usage = fs.usage();
        assert!(usage.contains("--visible"));
        assert!(!usage.contains("--secret"));
    }

    #[test]
    fn annotations_recorded() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(PathBuf::new());
        fs.var_p(&d, "config", None, PathBuf::new(), "").unwrap();
        fs.set_annotation("config", "filename_ext", vec!["toml".into()])
            .unwrap();
        let info = fs.flag("config").unwrap();
        assert_eq!(info.annotations["filename_ext"], vec!["toml"]);
    }

    #[test]
    fn lookup_shares_state() {
        let mut fs = FlagSet::new("dev");
        let d = Destination::new(0u32);
        fs.var_p(&d, "workers", None, 4, "").unwrap();
        let flag = fs.lookup("workers").unwrap();
        assert_eq!(flag.default_value(), Value::Integer(4));

        fs.parse(["--workers", "8"]).unwrap();
        assert!(flag.changed());
        assert_eq!(flag.value(), Value::Integer(8));
    }

    #[test]
    fn merge_inherits_missing_flags() {
        let mut parent = FlagSet::new("root");
        let mut child = FlagSet::new("child");
        let shared = Destination::new(false);
        let local = Destination::new(0i64);
        parent.var_p(&shared, "debug", Some('d'), false, "").unwrap();
        child.var_p(&local, "count", None, 0, "").unwrap();

        child.merge(&parent).unwrap();
        child.merge(&parent).unwrap();
        assert_eq!(child.names(), ["count", "debug"]);

        child.parse(["-d", "--count=2"]).unwrap();
        assert!(shared.get());
        assert!(parent.changed("debug"));
    }
}
