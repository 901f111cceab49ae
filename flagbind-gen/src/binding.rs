use std::collections::BTreeSet;

use crate::descriptor::{TypeDescriptor, TypeKind};
use crate::error::GenError;
use crate::naming::{NamingTriple, ResolvedName};

/// Which family of templates renders a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Scalar,
    Sequence,
    Record,
}

impl Binding {
    /// `None` for kinds the filter never accepts.
    pub fn of(ty: &TypeDescriptor) -> Option<Self> {
        match &ty.kind {
            TypeKind::Builtin | TypeKind::Alias { .. } => Some(Self::Scalar),
            TypeKind::Sequence { .. } => Some(Self::Sequence),
            TypeKind::Record { .. } => Some(Self::Record),
            _ => None,
        }
    }
}

/// Everything the templates need for one accepted type.
pub struct BindingSpec {
    pub key: String,
    pub binding: Binding,
    pub names: NamingTriple,
    pub imports: BTreeSet<String>,
    pub ty: syn::Type,
}

impl BindingSpec {
    pub fn new(ty: &TypeDescriptor, resolved: ResolvedName) -> Result<Self, GenError> {
        let key = ty.key();
        let binding = Binding::of(ty).ok_or_else(|| GenError::InvalidType {
            input: key.clone(),
            reason: "type kind has no binding template".into(),
        })?;
        let parsed: syn::Type =
            syn::parse_str(&resolved.triple.raw).map_err(|source| GenError::InvalidRawType {
                ty: key.clone(),
                raw: resolved.triple.raw.clone(),
                source,
            })?;
        Ok(Self {
            key,
            binding,
            names: resolved.triple,
            imports: resolved.imports,
            ty: parsed,
        })
    }
}
