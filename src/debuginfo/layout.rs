//! Type layout descriptors
//!
//! The subset of debug information the printers need: sizes, field
//! offsets, enumerators and pointer targets, keyed by type name.

use serde::{Deserialize, Serialize};

/// A struct/class member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Member name as it appears in the source
    pub name: String,
    /// Byte offset from the start of the enclosing object
    pub offset: u64,
    /// Member type name
    #[serde(rename = "type")]
    pub ty: String,
}

impl Field {
    pub fn new(name: impl Into<String>, offset: u64, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset,
            ty: ty.into(),
        }
    }
}

/// A named enumerator value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
}

/// Shape of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum TypeKind {
    Int {
        signed: bool,
    },
    Bool,
    Char,
    Pointer {
        target: String,
    },
    Struct {
        fields: Vec<Field>,
    },
    Enum {
        enumerators: Vec<Enumerator>,
    },
    Array {
        element: String,
        count: u64,
    },
    /// Alias for another type (also used for member typedefs such as
    /// `Table::value_type`)
    Typedef {
        target: String,
    },
    /// Known size, unknown contents (`void`, incomplete types, blobs)
    Opaque,
}

/// Layout of a single named type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeLayout {
    pub name: String,
    pub size: u64,
    pub kind: TypeKind,
}

impl TypeLayout {
    pub fn new(name: impl Into<String>, size: u64, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            size,
            kind,
        }
    }

    pub fn int(name: &str, size: u64, signed: bool) -> Self {
        Self::new(name, size, TypeKind::Int { signed })
    }

    pub fn pointer(target: &str, size: u64) -> Self {
        Self::new(
            format!("{}*", target),
            size,
            TypeKind::Pointer {
                target: target.to_string(),
            },
        )
    }

    pub fn structure(name: &str, size: u64, fields: Vec<Field>) -> Self {
        Self::new(name, size, TypeKind::Struct { fields })
    }

    pub fn typedef(name: &str, target: &str) -> Self {
        // Size is taken from the target when resolved
        Self::new(
            name,
            0,
            TypeKind::Typedef {
                target: target.to_string(),
            },
        )
    }

    /// Find a member by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        match &self.kind {
            TypeKind::Struct { fields } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Look up the enumerator for `value`
    pub fn enumerator(&self, value: i64) -> Option<&str> {
        match &self.kind {
            TypeKind::Enum { enumerators } => enumerators
                .iter()
                .find(|e| e.value == value)
                .map(|e| e.name.as_str()),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { .. })
    }
}

/// Strip cv-qualifiers and surrounding whitespace from a type name.
///
/// `const char *` becomes `char*`, `const mongo::BSONObj` becomes
/// `mongo::BSONObj`.
pub fn normalize_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for token in name.split_whitespace() {
        if token == "const" || token == "volatile" {
            continue;
        }
        if !out.is_empty() && !token.starts_with('*') && !token.starts_with('&') {
            out.push(' ');
        }
        out.push_str(token);
    }
    // `char const*` style
    out.replace(" const*", "*")
}

/// Split the template arguments of `name` at top-level commas.
///
/// Returns an empty list for non-template names.
pub fn template_arguments(name: &str) -> Vec<&str> {
    let Some(open) = name.find('<') else {
        return Vec::new();
    };
    let Some(close) = name.rfind('>') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    let inner = &name[open + 1..close];
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    args
}

/// The `index`-th template argument of `name`
pub fn template_argument(name: &str, index: usize) -> Option<&str> {
    template_arguments(name).get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_argument_simple() {
        assert_eq!(template_argument("mongo::StringMap<int>", 0), Some("int"));
        assert_eq!(template_argument("mongo::StringMap<int>", 1), None);
        assert_eq!(template_argument("mongo::Status", 0), None);
    }

    #[test]
    fn test_template_argument_nested() {
        let name = "mongo::StringMap<std::pair<int, int> >";
        assert_eq!(template_argument(name, 0), Some("std::pair<int, int>"));

        let name = "std::map<std::string, std::vector<long, std::allocator<long> > >";
        assert_eq!(
            template_arguments(name),
            vec!["std::string", "std::vector<long, std::allocator<long> >"]
        );
    }

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(normalize_type_name("const char *"), "char*");
        assert_eq!(normalize_type_name("char const*"), "char*");
        assert_eq!(normalize_type_name("const mongo::BSONObj"), "mongo::BSONObj");
        assert_eq!(normalize_type_name("  unsigned   int "), "unsigned int");
        assert_eq!(
            normalize_type_name("mongo::Status::ErrorInfo *"),
            "mongo::Status::ErrorInfo*"
        );
    }

    #[test]
    fn test_layout_lookups() {
        let layout = TypeLayout::structure(
            "Point",
            8,
            vec![Field::new("x", 0, "int"), Field::new("y", 4, "int")],
        );
        assert_eq!(layout.field("y").map(|f| f.offset), Some(4));
        assert!(layout.field("z").is_none());

        let e = TypeLayout::new(
            "Color",
            4,
            TypeKind::Enum {
                enumerators: vec![Enumerator {
                    name: "Red".into(),
                    value: 1,
                }],
            },
        );
        assert_eq!(e.enumerator(1), Some("Red"));
        assert_eq!(e.enumerator(2), None);
    }

    #[test]
    fn test_layout_json_shape() {
        let json = r#"{"name": "int", "size": 4, "kind": {"class": "int", "signed": true}}"#;
        let layout: TypeLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout, TypeLayout::int("int", 4, true));

        let json = r#"{"name": "P", "size": 8, "kind": {"class": "struct",
            "fields": [{"name": "v", "offset": 0, "type": "long"}]}}"#;
        let layout: TypeLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.field("v").map(|f| f.ty.as_str()), Some("long"));
    }
}
