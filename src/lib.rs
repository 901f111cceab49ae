//! Typed command-line flags bound into a layered config store.
//!
//! Flagbind is the runtime half of a code generator. `flagbind-gen` emits one
//! flag wrapper and one setting wrapper per bindable type; this crate provides
//! the flag set, the config store and the value coercion they call into. The
//! bindings for the standard types ship in [`generated`]:
//!
//! ```ignore
//! use flagbind::{ConfigStore, Flag, FlagSet};
//! use flagbind::generated::U16Flag;
//!
//! let mut store = ConfigStore::new();
//! let mut fs = FlagSet::new("myapp");
//!
//! let mut port = U16Flag {
//!     name: "port".into(),
//!     shorthand: Some('p'),
//!     usage: "listen port".into(),
//!     def_value: 8080,
//!     ..Default::default()
//! };
//! port.apply_to(&mut fs, &mut store)?;
//!
//! fs.parse(std::env::args().skip(1))?;
//! store.propagate(&fs)?;
//! let port: u16 = store.get_as("port")?;
//! ```
//!
//! # What `apply_to` does
//!
//! A generated flag registers itself in a fixed order:
//!
//! 1. Allocates a zero-valued [`Destination`] when none was supplied.
//! 2. Picks its environment variable: `env_key` if set, otherwise the flag
//!    name uppercased with non-alphanumerics replaced by `_`, prefixed with
//!    the store's env prefix.
//! 3. If that variable is present, its value replaces `def_value`. A value
//!    that does not parse is an error and the flag is not registered.
//! 4. Appends ` [env: KEY]` to the usage text.
//! 5. Declares the flag with [`FlagSet::var_p`], which writes the default into
//!    the destination right away.
//! 6. Applies deprecation, shorthand deprecation, hiding and annotations.
//! 7. Binds the flag into the store under its name.
//!
//! # Layer precedence
//!
//! ```text
//! Unchanged flag defaults    the value a flag was declared with
//!        ↑ overridden by
//! Defaults                   set_default() / set_default_<type>()
//!        ↑ overridden by
//! Config files               merge_config_file(), read_in_config()
//!        ↑ overridden by
//! Environment vars           bind_env(), automatic_env()
//!        ↑ overridden by
//! Changed flags              given on the command line
//!        ↑ overridden by
//! Overrides                  set()
//! ```
//!
//! Every layer is sparse; unset keys fall through to the layer below.
//! [`ConfigStore::propagate`] writes values from the layers above a flag's
//! default back into the destinations of flags that were not given on the
//! command line, so destinations agree with the store after startup.
//!
//! # Coercion
//!
//! [`FlagValue`] converts between command-line text, TOML values and Rust
//! types. It is implemented for `bool`, `char`, the integer types except
//! `u8`, `f32`, `f64`, `String`, `PathBuf`, `IpAddr`, `SocketAddr`,
//! `Duration` and `Vec<T>` of any of these.
//!
//! - Booleans accept `1 t T TRUE true True` and `0 f F FALSE false False`.
//! - Integers accept `0x`, `0o` and `0b` prefixes.
//! - Durations are written `1h30m`, `1.5s`, `250ms`; a bare TOML integer
//!   means seconds.
//! - Lists are comma-separated, optionally in brackets: `a,b` or `[a,b]`.
//!
//! # No global state
//!
//! There is no process-wide flag set or store. Both are ordinary values
//! created by the application's startup code and passed to every binding.
//! [`ConfigStore::with_env`] takes an explicit environment snapshot, which
//! is how the tests avoid touching the process environment.
//!
//! # Error handling
//!
//! All fallible operations return [`FlagbindError`]. Messages name the flag,
//! key, variable or file involved.

pub mod cast;
pub mod env;
pub mod error;
pub mod file;
pub mod generated;
pub mod testing;

mod destination;
mod duration;
mod flag;
mod flagset;
mod path;
mod persist;
mod store;

pub use cast::{CastError, FlagValue, Shape};
pub use destination::Destination;
pub use error::FlagbindError;
pub use file::SearchPath;
pub use flag::{Flag, Setting, apply_flags, bind_settings};
pub use flagset::{FlagInfo, FlagRef, FlagSet};
pub use store::ConfigStore;
