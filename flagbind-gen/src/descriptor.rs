//! Structural type descriptions consumed by the generator.
//!
//! A [`TypeDescriptor`] is what the host type system knows about a candidate
//! type: its qualified name and its kind. Descriptors are built
//! programmatically (see [`standard`]) or parsed from Rust type syntax with
//! [`TypeDescriptor::parse`], which is how the manifest lists them.

use std::collections::BTreeMap;
use std::fmt;

use quote::ToTokens;
use syn::{GenericArgument, PathArguments, Type};

use crate::error::GenError;

/// Primitive and prelude types that need no import and no module path.
const BUILTINS: &[&str] = &[
    "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
    "usize", "f32", "f64", "String",
];

/// A module path plus an identifier, e.g. `std::time` + `Duration`.
///
/// Builtins and types local to the output module carry an empty module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    pub module: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// A name without a module path.
    pub fn local(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    /// Split a `a::b::C` path at its last separator.
    pub fn from_path(path: &str) -> Self {
        let path = path.trim_start_matches("::");
        match path.rsplit_once("::") {
            Some((module, name)) => Self::new(module, name),
            None => Self::local(path),
        }
    }

    pub fn path(&self) -> String {
        if self.module.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.module, self.name)
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A declared field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Primitives and `String`.
    Builtin,
    /// `type Name = Underlying;`
    Alias { underlying: Box<TypeDescriptor> },
    /// `Vec<Elem>`.
    Sequence { elem: Box<TypeDescriptor> },
    /// A named struct or enum.
    Record { fields: Vec<Field> },
    Map,
    Reference,
    Array,
    Tuple,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: QualifiedName,
    pub kind: TypeKind,
}

impl TypeDescriptor {
    pub fn builtin(name: &str) -> Self {
        Self {
            name: QualifiedName::local(name),
            kind: TypeKind::Builtin,
        }
    }

    pub fn record(path: &str) -> Self {
        Self {
            name: QualifiedName::from_path(path),
            kind: TypeKind::Record { fields: Vec::new() },
        }
    }

    pub fn sequence(elem: TypeDescriptor) -> Self {
        Self {
            name: QualifiedName::local("Vec"),
            kind: TypeKind::Sequence {
                elem: Box::new(elem),
            },
        }
    }

    pub fn alias(path: &str, underlying: TypeDescriptor) -> Self {
        Self {
            name: QualifiedName::from_path(path),
            kind: TypeKind::Alias {
                underlying: Box::new(underlying),
            },
        }
    }

    fn unbindable(source: &str, kind: TypeKind) -> Self {
        Self {
            name: QualifiedName::local(source),
            kind,
        }
    }

    /// Identity key: the canonical type string. Two descriptors with the same
    /// key describe the same type.
    pub fn key(&self) -> String {
        match &self.kind {
            TypeKind::Sequence { elem } => format!("Vec<{}>", elem.key()),
            _ => self.name.path(),
        }
    }

    /// Whether this type denotes the single-byte type, following aliases.
    pub fn is_byte(&self) -> bool {
        match &self.kind {
            TypeKind::Builtin => self.name.path() == "u8",
            TypeKind::Alias { underlying } => underlying.is_byte(),
            _ => false,
        }
    }

    /// Parse a descriptor from Rust type syntax.
    ///
    /// `aliases` maps alias paths (`"crate::Port"`) to their underlying type
    /// syntax (`"u16"`); any path found there becomes an [`TypeKind::Alias`].
    pub fn parse(input: &str, aliases: &BTreeMap<String, String>) -> Result<Self, GenError> {
        let ty: Type = syn::parse_str(input).map_err(|e| GenError::InvalidType {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        from_syn(&ty, input, aliases)
    }
}

fn from_syn(
    ty: &Type,
    input: &str,
    aliases: &BTreeMap<String, String>,
) -> Result<TypeDescriptor, GenError> {
    let source = ty.to_token_stream().to_string();
    match ty {
        Type::Path(tp) if tp.qself.is_none() => from_path(&tp.path, input, &source, aliases),
        Type::Paren(inner) => from_syn(&inner.elem, input, aliases),
        Type::Group(inner) => from_syn(&inner.elem, input, aliases),
        Type::Reference(_) | Type::Ptr(_) => {
            Ok(TypeDescriptor::unbindable(&source, TypeKind::Reference))
        }
        Type::Array(_) | Type::Slice(_) => Ok(TypeDescriptor::unbindable(&source, TypeKind::Array)),
        Type::Tuple(_) => Ok(TypeDescriptor::unbindable(&source, TypeKind::Tuple)),
        _ => Err(GenError::InvalidType {
            input: input.to_string(),
            reason: format!("unsupported type syntax `{source}`"),
        }),
    }
}

fn from_path(
    path: &syn::Path,
    input: &str,
    source: &str,
    aliases: &BTreeMap<String, String>,
) -> Result<TypeDescriptor, GenError> {
    let Some(last) = path.segments.last() else {
        return Err(GenError::InvalidType {
            input: input.to_string(),
            reason: "empty path".into(),
        });
    };
    let joined = path
        .segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::");
    let ident = last.ident.to_string();

    if let Some(target) = aliases.get(&joined) {
        // Resolve the target without this alias so a self-referencing entry
        // cannot recurse forever.
        let mut rest = aliases.clone();
        rest.remove(&joined);
        let underlying = TypeDescriptor::parse(target, &rest)?;
        return Ok(TypeDescriptor::alias(&joined, underlying));
    }

    match &last.arguments {
        PathArguments::None => {
            if path.segments.len() == 1 && BUILTINS.contains(&ident.as_str()) {
                Ok(TypeDescriptor::builtin(&ident))
            } else if matches!(
                joined.as_str(),
                "std::string::String" | "alloc::string::String"
            ) {
                Ok(TypeDescriptor::builtin("String"))
            } else {
                Ok(TypeDescriptor::record(&joined))
            }
        }
        PathArguments::AngleBracketed(args) => {
            let generics: Vec<&Type> = args
                .args
                .iter()
                .filter_map(|arg| match arg {
                    GenericArgument::Type(t) => Some(t),
                    _ => None,
                })
                .collect();
            let is_vec = matches!(joined.as_str(), "Vec" | "std::vec::Vec" | "alloc::vec::Vec");
            match generics.as_slice() {
                [elem] if is_vec => Ok(TypeDescriptor::sequence(from_syn(elem, input, aliases)?)),
                _ if matches!(ident.as_str(), "HashMap" | "BTreeMap") => {
                    Ok(TypeDescriptor::unbindable(source, TypeKind::Map))
                }
                _ => Ok(TypeDescriptor::unbindable(source, TypeKind::Other)),
            }
        }
        PathArguments::Parenthesized(_) => Ok(TypeDescriptor::unbindable(source, TypeKind::Other)),
    }
}

/// The standard candidate set: every type the `flagbind` runtime can coerce,
/// plus the byte types the filter is expected to drop.
pub fn standard() -> Vec<TypeDescriptor> {
    let scalar = [
        "bool", "char", "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize",
        "f32", "f64", "String",
    ];
    let mut types: Vec<TypeDescriptor> = scalar.iter().map(|s| TypeDescriptor::builtin(s)).collect();

    types.extend(
        [
            "std::time::Duration",
            "std::net::IpAddr",
            "std::net::SocketAddr",
            "std::path::PathBuf",
        ]
        .iter()
        .map(|p| TypeDescriptor::record(p)),
    );

    for elem in ["String", "bool", "i32", "i64", "u64", "f64", "u8"] {
        types.push(TypeDescriptor::sequence(TypeDescriptor::builtin(elem)));
    }
    types.push(TypeDescriptor::sequence(TypeDescriptor::record(
        "std::time::Duration",
    )));
    types.push(TypeDescriptor::sequence(TypeDescriptor::record(
        "std::net::IpAddr",
    )));

    types
}
