//! Bindings for the standard types, generated by `build.rs` with
//! `flagbind-gen`.
//!
//! For every bindable type `T` with public name `N` (`I64`, `DurationVec`,
//! `IpAddr`, ...) this module provides:
//!
//! - `NFlag`: a flag declaration implementing [`Flag`](crate::Flag).
//! - `NSetting`: a config key declaration implementing [`Setting`](crate::Setting).
//! - `get_n(store, key)` and `set_default_n(store, key, value)`.

mod flags {
    include!(concat!(env!("OUT_DIR"), "/flags_generated.rs"));
}

mod config {
    include!(concat!(env!("OUT_DIR"), "/config_generated.rs"));
}

pub use config::*;
pub use flags::*;
