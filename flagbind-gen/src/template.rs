//! Binding templates.
//!
//! Each artifact kind has one production and one test template written as
//! `quote!` token templates over a [`BindingSpec`]. The tag-specific pieces
//! (documentation, zero value) come from one function per [`Binding`] tag.

use std::collections::BTreeSet;

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::binding::{Binding, BindingSpec};
use crate::emit::{Artifact, ArtifactKind};
use crate::error::GenError;
use crate::GenerateOptions;

/// Short names the generated code imports from the runtime. Foreign types
/// sharing one of these names are written fully qualified.
pub const RUNTIME_NAMES: &[&str] = &[
    "BTreeMap",
    "ConfigStore",
    "Destination",
    "Flag",
    "FlagSet",
    "FlagValue",
    "FlagbindError",
    "Setting",
    "env",
    "test_case",
];

/// Where the runtime and the generated items live.
pub struct RenderContext {
    runtime: String,
    output_module: String,
}

impl RenderContext {
    pub fn new(options: &GenerateOptions) -> Self {
        Self {
            runtime: options.runtime_path.clone(),
            output_module: options.output_module.clone(),
        }
    }

    fn runtime(&self, item: &str) -> String {
        format!("{}::{item}", self.runtime)
    }

    fn generated(&self, item: &str) -> String {
        format!("{}::{item}", self.output_module)
    }
}

/// The pieces that differ between binding tags.
struct TagParts {
    flag_doc: String,
    setting_doc: String,
    zero: TokenStream,
    needs_value_trait: bool,
}

fn scalar_parts(spec: &BindingSpec) -> TagParts {
    let raw = &spec.names.raw;
    let ty = &spec.ty;
    TagParts {
        flag_doc: format!("A command-line flag of type `{raw}`."),
        setting_doc: format!("A config-store setting of type `{raw}`."),
        zero: quote! { <#ty as FlagValue>::zero() },
        needs_value_trait: true,
    }
}

fn sequence_parts(spec: &BindingSpec) -> TagParts {
    let raw = &spec.names.raw;
    TagParts {
        flag_doc: format!(
            "A command-line flag of type `{raw}`. Values accumulate across repeated \
             occurrences and may be comma-separated."
        ),
        setting_doc: format!(
            "A config-store setting of type `{raw}`, read from a TOML array or a \
             comma-separated string."
        ),
        zero: quote! { Vec::new() },
        needs_value_trait: false,
    }
}

fn record_parts(spec: &BindingSpec) -> TagParts {
    let raw = &spec.names.raw;
    let ty = &spec.ty;
    TagParts {
        flag_doc: format!("A command-line flag of type `{raw}`, parsed from its textual form."),
        setting_doc: format!(
            "A config-store setting of type `{raw}`, parsed from its textual form."
        ),
        zero: quote! { <#ty as FlagValue>::zero() },
        needs_value_trait: true,
    }
}

fn tag_parts(spec: &BindingSpec) -> TagParts {
    match spec.binding {
        Binding::Scalar => scalar_parts(spec),
        Binding::Sequence => sequence_parts(spec),
        Binding::Record => record_parts(spec),
    }
}

fn flag_ident(spec: &BindingSpec) -> Ident {
    format_ident!("{}Flag", spec.names.public)
}

fn setting_ident(spec: &BindingSpec) -> Ident {
    format_ident!("{}Setting", spec.names.public)
}

fn getter_ident(spec: &BindingSpec) -> Ident {
    format_ident!("get_{}", spec.names.private)
}

fn set_default_ident(spec: &BindingSpec) -> Ident {
    format_ident!("set_default_{}", spec.names.private)
}

/// Render one artifact for `spec`.
pub fn render(
    ctx: &RenderContext,
    spec: &BindingSpec,
    kind: ArtifactKind,
) -> Result<Artifact, GenError> {
    let parts = tag_parts(spec);
    let (body, imports) = match kind {
        ArtifactKind::FlagSource => flag_source(ctx, spec, &parts),
        ArtifactKind::FlagTest => flag_test(ctx, spec, &parts),
        ArtifactKind::ConfigSource => config_source(ctx, spec, &parts),
        ArtifactKind::ConfigTest => config_test(ctx, spec),
    };

    // Each artifact must stand alone as a compilation unit.
    syn::parse2::<syn::File>(body.clone()).map_err(|source| GenError::Render {
        artifact: format!("{} for {}", kind.file_name(), spec.key),
        source,
    })?;

    Ok(Artifact {
        kind,
        type_key: spec.key.clone(),
        imports,
        body,
    })
}

fn with_type_imports(spec: &BindingSpec, paths: Vec<String>) -> BTreeSet<String> {
    let mut imports: BTreeSet<String> = paths.into_iter().collect();
    imports.extend(spec.imports.iter().cloned());
    imports
}

fn flag_source(
    ctx: &RenderContext,
    spec: &BindingSpec,
    parts: &TagParts,
) -> (TokenStream, BTreeSet<String>) {
    let ident = flag_ident(spec);
    let ty = &spec.ty;
    let doc = &parts.flag_doc;
    let zero = &parts.zero;

    let body = quote! {
        #[doc = #doc]
        #[derive(Debug, Clone)]
        pub struct #ident {
            /// Name as it appears on the command line.
            pub name: String,
            /// One-letter abbreviation.
            pub shorthand: Option<char>,
            /// Help text.
            pub usage: String,
            /// Whether nested commands inherit the flag.
            pub persistent: bool,
            /// Metadata for completion and documentation tooling.
            pub annotations: BTreeMap<String, Vec<String>>,
            /// Replacement hint shown when the flag is used. Empty when not deprecated.
            pub deprecated: String,
            /// Replacement hint shown when the shorthand is used. Empty when not deprecated.
            pub shorthand_deprecated: String,
            /// Omit the flag from help output.
            pub hidden: bool,
            /// Environment variable overriding the default. Derived from `name` when empty.
            pub env_key: String,
            /// The default value.
            pub def_value: #ty,
            /// Cell the parsed value is written into. Allocated on registration when `None`.
            pub destination: Option<Destination<#ty>>,
        }

        impl Default for #ident {
            fn default() -> Self {
                Self {
                    name: String::new(),
                    shorthand: None,
                    usage: String::new(),
                    persistent: false,
                    annotations: BTreeMap::new(),
                    deprecated: String::new(),
                    shorthand_deprecated: String::new(),
                    hidden: false,
                    env_key: String::new(),
                    def_value: #zero,
                    destination: None,
                }
            }
        }

        impl Flag for #ident {
            fn is_persistent(&self) -> bool {
                self.persistent
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn apply_to(
                &mut self,
                fs: &mut FlagSet,
                store: &mut ConfigStore,
            ) -> Result<(), FlagbindError> {
                let destination = self
                    .destination
                    .get_or_insert_with(Destination::zeroed)
                    .clone();

                let env_key = env::effective_key(&self.name, &self.env_key, store.env_prefix());
                let def_value = match store.env_var(&env_key) {
                    Some(raw) => env::coerce::<#ty>(&env_key, raw)?,
                    None => self.def_value.clone(),
                };
                let usage = env::append_env_to_usage(&self.usage, &env_key);

                fs.var_p(&destination, &self.name, self.shorthand, def_value, &usage)?;

                if !self.deprecated.is_empty() {
                    fs.mark_deprecated(&self.name, &self.deprecated)?;
                }
                if !self.shorthand_deprecated.is_empty() {
                    fs.mark_shorthand_deprecated(&self.name, &self.shorthand_deprecated)?;
                }
                if self.hidden {
                    fs.mark_hidden(&self.name)?;
                }
                for (key, values) in &self.annotations {
                    fs.set_annotation(&self.name, key, values.clone())?;
                }

                let flag = fs
                    .lookup(&self.name)
                    .ok_or_else(|| FlagbindError::NoSuchFlag(self.name.clone()))?;
                store.bind_flag(&self.name, flag)
            }
        }
    };

    let mut paths = vec![
        "std::collections::BTreeMap".to_string(),
        ctx.runtime("env"),
        ctx.runtime("ConfigStore"),
        ctx.runtime("Destination"),
        ctx.runtime("Flag"),
        ctx.runtime("FlagSet"),
        ctx.runtime("FlagbindError"),
    ];
    if parts.needs_value_trait {
        paths.push(ctx.runtime("FlagValue"));
    }
    (body, with_type_imports(spec, paths))
}

fn flag_test(
    ctx: &RenderContext,
    spec: &BindingSpec,
    parts: &TagParts,
) -> (TokenStream, BTreeSet<String>) {
    let ident = flag_ident(spec);
    let test_name = format_ident!("{}_flag_parses_and_binds", spec.names.private);
    let public = &spec.names.public;
    let ty = &spec.ty;
    let zero = &parts.zero;
    let missing = format!("no test case for {public}");

    let body = quote! {
        #[test]
        fn #test_name() {
            let mut store = ConfigStore::with_env(Vec::<(String, String)>::new());
            let case = test_case(#public).expect(#missing);

            let dest = Destination::new(#zero);
            let mut flag = #ident {
                name: "test".to_string(),
                shorthand: Some('t'),
                usage: "help".to_string(),
                persistent: true,
                annotations: BTreeMap::from([("key".to_string(), vec!["value".to_string()])]),
                deprecated: "for test".to_string(),
                shorthand_deprecated: "for test".to_string(),
                hidden: true,
                env_key: "TEST".to_string(),
                def_value: dest.get(),
                destination: Some(dest.clone()),
            };
            assert!(flag.is_persistent());
            assert_eq!(flag.name(), "test");

            let mut fs = FlagSet::new("dev");
            flag.apply_to(&mut fs, &mut store).unwrap();
            assert!(flag.destination.as_ref().unwrap().same_cell(&dest));
            fs.parse([format!("-t={}", case.flag)]).unwrap();

            let want = <#ty as FlagValue>::parse_str(case.want).unwrap();
            assert!(fs.changed("test"));
            assert_eq!(dest.get(), want);

            let got = store.get_as::<#ty>("test").unwrap();
            assert_eq!(got, want);
        }
    };

    let paths = vec![
        "std::collections::BTreeMap".to_string(),
        ctx.runtime("testing::test_case"),
        ctx.runtime("ConfigStore"),
        ctx.runtime("Destination"),
        ctx.runtime("Flag"),
        ctx.runtime("FlagSet"),
        ctx.runtime("FlagValue"),
        ctx.generated(&ident.to_string()),
    ];
    (body, with_type_imports(spec, paths))
}

fn config_source(
    ctx: &RenderContext,
    spec: &BindingSpec,
    parts: &TagParts,
) -> (TokenStream, BTreeSet<String>) {
    let ident = setting_ident(spec);
    let getter = getter_ident(spec);
    let set_default = set_default_ident(spec);
    let raw = &spec.names.raw;
    let ty = &spec.ty;
    let doc = &parts.setting_doc;
    let zero = &parts.zero;
    let getter_doc = format!("Look up `key` in `store` as `{raw}`.");
    let set_default_doc = format!("Register a `{raw}` default for `key` in `store`.");

    let body = quote! {
        #[doc = #doc]
        #[derive(Debug, Clone)]
        pub struct #ident {
            /// Key in the config store.
            pub key: String,
            /// Environment variable bound to the key. Derived from `key` when empty.
            pub env_key: String,
            /// Default registered with the store.
            pub def_value: #ty,
            /// Cell the resolved value is written into. Allocated on binding when `None`.
            pub destination: Option<Destination<#ty>>,
        }

        impl Default for #ident {
            fn default() -> Self {
                Self {
                    key: String::new(),
                    env_key: String::new(),
                    def_value: #zero,
                    destination: None,
                }
            }
        }

        impl Setting for #ident {
            fn key(&self) -> &str {
                &self.key
            }

            fn bind_to(&mut self, store: &mut ConfigStore) -> Result<(), FlagbindError> {
                let destination = self
                    .destination
                    .get_or_insert_with(Destination::zeroed)
                    .clone();

                let env_key = env::effective_key(&self.key, &self.env_key, store.env_prefix());
                store.set_default(&self.key, self.def_value.to_toml())?;
                store.bind_env(&self.key, &env_key)?;

                destination.set(store.get_as::<#ty>(&self.key)?);
                Ok(())
            }
        }

        #[doc = #getter_doc]
        pub fn #getter(store: &ConfigStore, key: &str) -> Result<#ty, FlagbindError> {
            store.get_as::<#ty>(key)
        }

        #[doc = #set_default_doc]
        pub fn #set_default(
            store: &mut ConfigStore,
            key: &str,
            value: #ty,
        ) -> Result<(), FlagbindError> {
            store.set_default(key, value.to_toml())
        }
    };

    let paths = vec![
        ctx.runtime("env"),
        ctx.runtime("ConfigStore"),
        ctx.runtime("Destination"),
        ctx.runtime("FlagValue"),
        ctx.runtime("FlagbindError"),
        ctx.runtime("Setting"),
    ];
    (body, with_type_imports(spec, paths))
}

fn config_test(ctx: &RenderContext, spec: &BindingSpec) -> (TokenStream, BTreeSet<String>) {
    let ident = setting_ident(spec);
    let getter = getter_ident(spec);
    let set_default = set_default_ident(spec);
    let test_name = format_ident!("{}_setting_binds_and_round_trips", spec.names.private);
    let public = &spec.names.public;
    let ty = &spec.ty;
    let missing = format!("no test case for {public}");

    let body = quote! {
        #[test]
        fn #test_name() {
            let case = test_case(#public).expect(#missing);
            let mut store = ConfigStore::with_env(vec![(
                "FLAGBIND_TEST".to_string(),
                case.flag.to_string(),
            )]);
            let want = <#ty as FlagValue>::parse_str(case.want).unwrap();

            let mut setting = #ident {
                key: "test".to_string(),
                env_key: "FLAGBIND_TEST".to_string(),
                ..Default::default()
            };
            assert_eq!(setting.key(), "test");
            setting.bind_to(&mut store).unwrap();

            let dest = setting.destination.clone().unwrap();
            assert_eq!(dest.get(), want);
            assert_eq!(#getter(&store, "test").unwrap(), want);

            store.reset();
            assert!(#getter(&store, "test").is_err());

            #set_default(&mut store, "test", want.clone()).unwrap();
            assert_eq!(#getter(&store, "test").unwrap(), want);
        }
    };

    let paths = vec![
        ctx.runtime("testing::test_case"),
        ctx.runtime("ConfigStore"),
        ctx.runtime("FlagValue"),
        ctx.runtime("Setting"),
        ctx.generated(&ident.to_string()),
        ctx.generated(&getter.to_string()),
        ctx.generated(&set_default.to_string()),
    ];
    (body, with_type_imports(spec, paths))
}
