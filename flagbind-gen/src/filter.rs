//! Selection of the types that get bindings.

use crate::descriptor::{TypeDescriptor, TypeKind};

/// Record types with a natural single-value command-line form.
pub const ALLOWED_RECORDS: &[&str] = &[
    "std::net::IpAddr",
    "std::net::SocketAddr",
    "std::time::Duration",
    "std::path::PathBuf",
];

/// Decide whether a binding should be generated for `ty`.
///
/// Byte types are excluded as scalars and as sequence elements: a `u8` flag
/// is not meaningful on its own and `Vec<u8>` is opaque data. Records pass
/// only when allow-listed. A sequence passes only when its element would pass
/// on its own and is not itself a sequence, since the runtime parses one
/// comma-separated level.
pub fn accept(ty: &TypeDescriptor) -> bool {
    match &ty.kind {
        TypeKind::Builtin | TypeKind::Alias { .. } => !ty.is_byte(),
        TypeKind::Sequence { elem } => {
            !matches!(elem.kind, TypeKind::Sequence { .. }) && accept(elem)
        }
        TypeKind::Record { .. } => ALLOWED_RECORDS.contains(&ty.name.path().as_str()),
        TypeKind::Map | TypeKind::Reference | TypeKind::Array | TypeKind::Tuple | TypeKind::Other => {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn parse(input: &str) -> TypeDescriptor {
        TypeDescriptor::parse(input, &BTreeMap::new()).unwrap()
    }

    #[test]
    fn scalars_accepted() {
        for ty in ["bool", "i8", "i64", "u16", "f64", "String", "char"] {
            assert!(accept(&parse(ty)), "{ty} should be accepted");
        }
    }

    #[test]
    fn byte_rejected() {
        assert!(!accept(&parse("u8")));
    }

    #[test]
    fn byte_alias_rejected() {
        let aliases = BTreeMap::from([("crate::Octet".to_string(), "u8".to_string())]);
        let ty = TypeDescriptor::parse("crate::Octet", &aliases).unwrap();
        assert!(!accept(&ty));
    }

    #[test]
    fn non_byte_alias_accepted() {
        let aliases = BTreeMap::from([("crate::Port".to_string(), "u16".to_string())]);
        let ty = TypeDescriptor::parse("crate::Port", &aliases).unwrap();
        assert!(accept(&ty));
    }

    #[test]
    fn sequences_accepted_unless_bytes() {
        assert!(accept(&parse("Vec<String>")));
        assert!(accept(&parse("Vec<std::time::Duration>")));
        assert!(!accept(&parse("Vec<u8>")));
    }

    #[test]
    fn sequence_elements_must_be_bindable() {
        assert!(accept(&parse("Vec<std::net::IpAddr>")));
        assert!(!accept(&parse("Vec<crate::Settings>")));
        assert!(!accept(&parse("Vec<&str>")));
        assert!(!accept(&parse("Vec<Vec<String>>")));
        assert!(!accept(&parse("Vec<HashMap<String, String>>")));
    }

    #[test]
    fn allow_listed_records_only() {
        assert!(accept(&parse("std::net::IpAddr")));
        assert!(accept(&parse("std::time::Duration")));
        assert!(!accept(&parse("std::net::Ipv6Addr")));
        assert!(!accept(&parse("crate::Settings")));
    }

    #[test]
    fn other_kinds_rejected() {
        for ty in ["&str", "[u8; 4]", "(i32, i32)", "HashMap<String, String>", "Option<u16>"] {
            assert!(!accept(&parse(ty)), "{ty} should be rejected");
        }
    }
}
