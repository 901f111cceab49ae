//! The three name systems used to assemble generated code.
//!
//! | System    | `bool`  | `Vec<i64>` | `std::time::Duration` |
//! |-----------|---------|------------|-----------------------|
//! | `public`  | `Bool`  | `I64Vec`   | `Duration`            |
//! | `private` | `bool`  | `i64_vec`  | `duration`            |
//! | `raw`     | `bool`  | `Vec<i64>` | `Duration` (imported) |
//!
//! `public` names generated types (`BoolFlag`), `private` names generated
//! functions (`get_i64_vec`) and `raw` is the type expression written into
//! field and cast positions. Each type is resolved once and cached; two
//! distinct types may never share a `public` or `private` name.

use std::collections::{BTreeMap, BTreeSet};

use heck::{ToSnakeCase, ToUpperCamelCase};

use crate::descriptor::{QualifiedName, TypeDescriptor, TypeKind};
use crate::error::GenError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTriple {
    pub public: String,
    pub private: String,
    pub raw: String,
}

/// A resolved triple plus the paths its `raw` form needs in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub triple: NamingTriple,
    pub imports: BTreeSet<String>,
}

pub struct NameSystems {
    output_module: String,
    reserved: BTreeSet<String>,
    cache: BTreeMap<String, ResolvedName>,
    public_owner: BTreeMap<String, String>,
    private_owner: BTreeMap<String, String>,
}

impl NameSystems {
    /// `output_module` is where the generated code lives; types declared there
    /// are referenced bare. `reserved` lists short names the generated code
    /// already imports, which a foreign type must not shadow.
    pub fn new<'a>(output_module: &str, reserved: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            output_module: output_module.to_string(),
            reserved: reserved.into_iter().map(str::to_string).collect(),
            cache: BTreeMap::new(),
            public_owner: BTreeMap::new(),
            private_owner: BTreeMap::new(),
        }
    }

    pub fn resolve(&mut self, ty: &TypeDescriptor) -> Result<ResolvedName, GenError> {
        let key = ty.key();
        if let Some(resolved) = self.cache.get(&key) {
            return Ok(resolved.clone());
        }

        let public = public_name(ty);
        let private = public.to_snake_case();
        claim(&mut self.public_owner, &public, &key)?;
        claim(&mut self.private_owner, &private, &key)?;

        let mut imports = BTreeSet::new();
        let raw = self.raw_name(ty, &mut imports);
        let resolved = ResolvedName {
            triple: NamingTriple {
                public,
                private,
                raw,
            },
            imports,
        };
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    fn raw_name(&self, ty: &TypeDescriptor, imports: &mut BTreeSet<String>) -> String {
        match &ty.kind {
            TypeKind::Builtin => ty.name.name.clone(),
            TypeKind::Sequence { elem } => format!("Vec<{}>", self.raw_name(elem, imports)),
            _ => self.qualified(&ty.name, imports),
        }
    }

    fn qualified(&self, name: &QualifiedName, imports: &mut BTreeSet<String>) -> String {
        if name.module.is_empty() || name.module == self.output_module {
            return name.name.clone();
        }
        if self.reserved.contains(&name.name) {
            return absolute(name);
        }
        imports.insert(name.path());
        name.name.clone()
    }
}

fn public_name(ty: &TypeDescriptor) -> String {
    match &ty.kind {
        TypeKind::Sequence { elem } => format!("{}Vec", public_name(elem)),
        _ => ty.name.name.to_upper_camel_case(),
    }
}

fn absolute(name: &QualifiedName) -> String {
    let first = name.module.split("::").next().unwrap_or_default();
    if matches!(first, "crate" | "self" | "super") {
        name.path()
    } else {
        format!("::{}", name.path())
    }
}

fn claim(owners: &mut BTreeMap<String, String>, name: &str, key: &str) -> Result<(), GenError> {
    match owners.get(name) {
        Some(owner) if owner != key => Err(GenError::NamingCollision {
            name: name.to_string(),
            first: owner.clone(),
            second: key.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            owners.insert(name.to_string(), key.to_string());
            Ok(())
        }
    }
}
