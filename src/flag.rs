use crate::error::FlagbindError;
use crate::flagset::FlagSet;
use crate::store::ConfigStore;

/// A flag declaration that can register itself with a flag set and bind
/// itself into a config store.
///
/// Implemented by the generated `<Type>Flag` wrappers.
pub trait Flag {
    /// Whether nested commands inherit the flag.
    fn is_persistent(&self) -> bool;

    fn name(&self) -> &str;

    fn apply_to(&mut self, fs: &mut FlagSet, store: &mut ConfigStore) -> Result<(), FlagbindError>;
}

/// A config key with a default, an environment binding and a destination.
///
/// Implemented by the generated `<Type>Setting` wrappers.
pub trait Setting {
    fn key(&self) -> &str;

    fn bind_to(&mut self, store: &mut ConfigStore) -> Result<(), FlagbindError>;
}

/// Apply each flag to `persistent` or `local` according to
/// [`Flag::is_persistent`], stopping at the first error.
pub fn apply_flags(
    flags: &mut [&mut dyn Flag],
    local: &mut FlagSet,
    persistent: &mut FlagSet,
    store: &mut ConfigStore,
) -> Result<(), FlagbindError> {
    for flag in flags.iter_mut() {
        if flag.is_persistent() {
            flag.apply_to(persistent, store)?;
        } else {
            flag.apply_to(local, store)?;
        }
    }
    Ok(())
}

/// Bind each setting to `store`, stopping at the first error.
pub fn bind_settings(
    settings: &mut [&mut dyn Setting],
    store: &mut ConfigStore,
) -> Result<(), FlagbindError> {
    for setting in settings.iter_mut() {
        setting.bind_to(store)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::generated::{BoolFlag, DurationSetting, I64Flag, StringFlag, get_duration};
    use std::time::Duration;

    fn store(vars: &[(&str, &str)]) -> ConfigStore {
        ConfigStore::with_env(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn bool_flag_from_command_line() {
        let mut s = store(&[]);
        let mut fs = FlagSet::new("dev");
        let dest = Destination::new(false);
        let mut flag = BoolFlag {
            name: "t".into(),
            shorthand: Some('t'),
            destination: Some(dest.clone()),
            ..Default::default()
        };
        flag.apply_to(&mut fs, &mut s).unwrap();
        fs.parse(["-t=true"]).unwrap();

        assert!(dest.get());
        assert!(s.get_as::<bool>("t").unwrap());
    }

    #[test]
    fn env_overrides_default() {
        let mut s = store(&[("TEST", "42")]);
        let mut fs = FlagSet::new("dev");
        let mut flag = I64Flag {
            name: "test".into(),
            env_key: "TEST".into(),
            def_value: 7,
            ..Default::default()
        };
        flag.apply_to(&mut fs, &mut s).unwrap();

        let dest = flag.destination.clone().unwrap();
        assert_eq!(dest.get(), 42);
        assert_eq!(s.get_as::<i64>("test").unwrap(), 42);
        assert!(fs.flag("test").unwrap().usage.ends_with("[env: TEST]"));
    }

    #[test]
    fn derived_env_key_uses_prefix() {
        let mut s = store(&[("MYAPP_LOG_LEVEL", "debug")]);
        s.set_env_prefix("myapp");
        let mut fs = FlagSet::new("dev");
        let mut flag = StringFlag {
            name: "log-level".into(),
            usage: "verbosity".into(),
            def_value: "info".into(),
            ..Default::default()
        };
        flag.apply_to(&mut fs, &mut s).unwrap();

        assert_eq!(flag.destination.unwrap().get(), "debug");
        assert_eq!(
            fs.flag("log-level").unwrap().usage,
            "verbosity [env: MYAPP_LOG_LEVEL]"
        );
    }

    #[test]
    fn unparsable_env_is_reported_and_flag_not_registered() {
        let mut s = store(&[("TEST", "forty-two")]);
        let mut fs = FlagSet::new("dev");
        let mut flag = I64Flag {
            name: "test".into(),
            env_key: "TEST".into(),
            ..Default::default()
        };
        match flag.apply_to(&mut fs, &mut s) {
            Err(FlagbindError::EnvValue { key, value, .. }) => {
                assert_eq!(key, "TEST");
                assert_eq!(value, "forty-two");
            }
            other => panic!("Expected EnvValue, got: {other:?}"),
        }
        assert!(fs.lookup("test").is_none());
        assert!(s.get("test").is_none());
    }

    #[test]
    fn deprecated_flag_reported_and_documented() {
        let mut s = store(&[]);
        let mut fs = FlagSet::new("dev");
        let mut flag = StringFlag {
            name: "old".into(),
            usage: "legacy".into(),
            deprecated: "use --new-flag".into(),
            ..Default::default()
        };
        flag.apply_to(&mut fs, &mut s).unwrap();

        assert!(fs.usage().contains("(DEPRECATED: use --new-flag)"));
        fs.parse(["--old=x"]).unwrap();
        assert_eq!(fs.warnings(), ["Flag --old has been deprecated, use --new-flag"]);
    }

    #[test]
    fn duplicate_flag_is_fatal() {
        let mut s = store(&[]);
        let mut fs = FlagSet::new("dev");
        let mut first = BoolFlag {
            name: "verbose".into(),
            ..Default::default()
        };
        let mut second = first.clone();
        first.apply_to(&mut fs, &mut s).unwrap();
        assert!(matches!(
            second.apply_to(&mut fs, &mut s),
            Err(FlagbindError::DuplicateFlag(name)) if name == "verbose"
        ));
    }

    #[test]
    fn shorthand_deprecation_without_shorthand_fails_after_registration() {
        let mut s = store(&[]);
        let mut fs = FlagSet::new("dev");
        let mut flag = BoolFlag {
            name: "force".into(),
            shorthand_deprecated: "use --force".into(),
            ..Default::default()
        };
        assert!(matches!(
            flag.apply_to(&mut fs, &mut s),
            Err(FlagbindError::NoShorthand(_))
        ));
        // Registration is not rolled back.
        assert!(fs.lookup("force").is_some());
    }

    #[test]
    fn persistent_flags_routed_separately() {
        let mut s = store(&[]);
        let mut local = FlagSet::new("serve");
        let mut persistent = FlagSet::new("root");
        let mut debug = BoolFlag {
            name: "debug".into(),
            persistent: true,
            ..Default::default()
        };
        let mut port = I64Flag {
            name: "port".into(),
            ..Default::default()
        };

        let mut flags: [&mut dyn Flag; 2] = [&mut debug, &mut port];
        apply_flags(&mut flags, &mut local, &mut persistent, &mut s).unwrap();
        assert_eq!(persistent.names(), ["debug"]);
        assert_eq!(local.names(), ["port"]);

        local.merge(&persistent).unwrap();
        local.parse(["--debug", "--port=1"]).unwrap();
        assert!(debug.destination.unwrap().get());
    }

    #[test]
    fn settings_bind_defaults_and_env() {
        let mut s = store(&[("TIMEOUT", "2m")]);
        let mut timeout = DurationSetting {
            key: "timeout".into(),
            def_value: Duration::from_secs(5),
            ..Default::default()
        };
        let mut retry = DurationSetting {
            key: "retry".into(),
            def_value: Duration::from_secs(1),
            ..Default::default()
        };
        let mut settings: [&mut dyn Setting; 2] = [&mut timeout, &mut retry];
        bind_settings(&mut settings, &mut s).unwrap();

        assert_eq!(timeout.destination.unwrap().get(), Duration::from_secs(120));
        assert_eq!(retry.destination.unwrap().get(), Duration::from_secs(1));
        assert_eq!(get_duration(&s, "retry").unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn propagate_after_parse_aligns_destination() {
        let mut s = store(&[]);
        let mut fs = FlagSet::new("dev");
        let mut flag = I64Flag {
            name: "workers".into(),
            def_value: 4,
            ..Default::default()
        };
        flag.apply_to(&mut fs, &mut s).unwrap();
        s.merge_toml_str("workers = 16", std::path::Path::new("app.toml"))
            .unwrap();

        fs.parse(Vec::<String>::new()).unwrap();
        s.propagate(&fs).unwrap();

        let dest = flag.destination.unwrap();
        assert_eq!(dest.get(), 16);
        assert_eq!(s.get_as::<i64>("workers").unwrap(), dest.get());
    }
}
