//! Type registry
//!
//! Maps type names to layouts. Populated once at startup (built-in x86_64
//! layouts, then an optional JSON layout file exported from debug info)
//! and queried by name while rendering.

use super::layout::{normalize_type_name, Enumerator, Field, TypeKind, TypeLayout};
use super::TypeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// libstdc++ (C++11 ABI) `std::string`
pub const STD_STRING: &str =
    "std::__cxx11::basic_string<char, std::char_traits<char>, std::allocator<char> >";

/// Value types for which `mongo::StringMap<T>` layouts are built in
const BUILTIN_STRING_MAP_VALUES: &[&str] = &[
    "int",
    "unsigned int",
    "long",
    "bool",
    "std::string",
    "mongo::BSONObj",
];

/// On-disk layout file
#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutFile {
    #[serde(default = "default_pointer_size")]
    pub pointer_size: u64,
    pub types: Vec<TypeLayout>,
}

fn default_pointer_size() -> u64 {
    8
}

/// Name -> layout lookup table
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    pointer_size: u64,
    types: HashMap<String, Rc<TypeLayout>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new(pointer_size: u64) -> Self {
        Self {
            pointer_size,
            types: HashMap::new(),
        }
    }

    /// Registry pre-populated with x86_64 layouts for primitives, libstdc++
    /// strings and the mongo types the printers understand
    pub fn builtin() -> Self {
        let mut registry = Self::new(8);
        registry.insert_builtins();
        for value_type in BUILTIN_STRING_MAP_VALUES {
            // Built-in value types are always resolvable
            if let Err(e) = registry.add_string_map_instance(value_type) {
                log::warn!("Skipping built-in StringMap<{}>: {}", value_type, e);
            }
        }
        registry
    }

    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Add or replace a layout
    pub fn insert(&mut self, mut layout: TypeLayout) {
        layout.name = normalize_type_name(&layout.name);
        if self.types.contains_key(&layout.name) {
            log::debug!("Replacing layout for {}", layout.name);
        }
        self.types.insert(layout.name.clone(), Rc::new(layout));
    }

    /// Merge layouts from a JSON layout file body, returning how many were added
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, TypeError> {
        let file: LayoutFile =
            serde_json::from_str(json).map_err(|e| TypeError::Layout(e.to_string()))?;
        if file.pointer_size != self.pointer_size {
            log::warn!(
                "Layout file pointer size {} overrides {}",
                file.pointer_size,
                self.pointer_size
            );
            self.pointer_size = file.pointer_size;
        }
        let count = file.types.len();
        for layout in file.types {
            self.insert(layout);
        }
        Ok(count)
    }

    /// Merge layouts from a JSON layout file on disk
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, TypeError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| TypeError::Layout(format!("{}: {}", path.display(), e)))?;
        let count = self.extend_from_json(&json)?;
        log::info!("Loaded {} layouts from {}", count, path.display());
        Ok(count)
    }

    /// Look up a type by name without following typedefs.
    ///
    /// `T*` and `T[N]` are synthesized when not registered explicitly.
    pub fn lookup(&self, name: &str) -> Result<Rc<TypeLayout>, TypeError> {
        let name = normalize_type_name(name);
        if let Some(layout) = self.types.get(&name) {
            return Ok(Rc::clone(layout));
        }

        if let Some(target) = name.strip_suffix('*') {
            return Ok(Rc::new(TypeLayout::pointer(target, self.pointer_size)));
        }

        if let Some((element, count)) = parse_array_name(&name) {
            let element_layout = self.resolve(element)?;
            return Ok(Rc::new(TypeLayout::new(
                name.clone(),
                element_layout.size * count,
                TypeKind::Array {
                    element: element.to_string(),
                    count,
                },
            )));
        }

        Err(TypeError::UnknownType(name))
    }

    /// Look up a type by name and follow typedefs to the underlying layout
    pub fn resolve(&self, name: &str) -> Result<Rc<TypeLayout>, TypeError> {
        let mut layout = self.lookup(name)?;
        // Bounded so a cyclic layout file cannot hang a render
        for _ in 0..32 {
            let target = match &layout.kind {
                TypeKind::Typedef { target } => target.clone(),
                _ => return Ok(layout),
            };
            layout = self.lookup(&target)?;
        }
        Err(TypeError::TypedefLoop(name.to_string()))
    }

    /// Whether `name` resolves to a layout
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Natural alignment of a type
    pub fn alignment_of(&self, name: &str) -> Result<u64, TypeError> {
        let layout = self.resolve(name)?;
        match &layout.kind {
            TypeKind::Struct { fields } => fields
                .iter()
                .try_fold(1u64, |acc, f| -> Result<u64, TypeError> {
                    Ok(acc.max(self.alignment_of(&f.ty)?))
                }),
            TypeKind::Array { element, .. } => self.alignment_of(element),
            _ => Ok(layout.size.clamp(1, 8)),
        }
    }

    /// Synthesize the layouts of `mongo::StringMap<value_type>`.
    ///
    /// The table is an open-addressed `UnorderedFastKeyTable` whose slots
    /// store `std::pair<std::string, V>` in raw aligned storage; the pair
    /// type is reachable through the `value_type` member typedef. Returns
    /// the map's type name.
    pub fn add_string_map_instance(&mut self, value_type: &str) -> Result<String, TypeError> {
        let value_type = normalize_type_name(value_type);
        let value_layout = self.resolve(&value_type)?;
        let value_align = self.alignment_of(&value_type)?;
        let string_layout = self.resolve("std::string")?;
        let pointer = self.pointer_size;

        let map = format!("mongo::StringMap<{}>", value_type);
        let entry = format!("{}::Entry", map);
        let area = format!("{}::Area", map);
        let scoped = format!("boost::scoped_array<{}>", entry);
        let pair = format!("std::pair<std::string, {}>", value_type);

        let pair_align = value_align.max(pointer);
        let second = align_up(string_layout.size, value_align);
        let pair_size = align_up(second + value_layout.size, pair_align);
        self.insert(TypeLayout::structure(
            &pair,
            pair_size,
            vec![
                Field::new("first", 0, "std::string"),
                Field::new("second", second, value_type.as_str()),
            ],
        ));
        self.insert(TypeLayout::typedef(&format!("{}::value_type", map), &pair));

        let data = align_up(8, pair_align);
        let entry_size = align_up(data + pair_size, pair_align);
        self.insert(TypeLayout::structure(
            &entry,
            entry_size,
            vec![
                Field::new("used", 0, "bool"),
                Field::new("curHash", 4, "unsigned int"),
                Field::new("data", data, format!("unsigned char[{}]", pair_size)),
            ],
        ));
        self.insert(TypeLayout::structure(
            &scoped,
            pointer,
            vec![Field::new("px", 0, format!("{}*", entry))],
        ));
        self.insert(TypeLayout::structure(
            &area,
            8 + pointer,
            vec![
                Field::new("_capacity", 0, "int"),
                Field::new("_maxProbe", 4, "int"),
                Field::new("_entries", 8, scoped.as_str()),
            ],
        ));
        self.insert(TypeLayout::structure(
            &map,
            16 + pointer,
            vec![
                Field::new("_size", 0, "unsigned int"),
                Field::new("_area", 8, area.as_str()),
            ],
        ));

        log::debug!(
            "Added {} (entry {} bytes, value @ +{})",
            map,
            entry_size,
            data + second
        );
        Ok(map)
    }

    fn insert_builtins(&mut self) {
        for (name, size, signed) in [
            ("signed char", 1, true),
            ("unsigned char", 1, false),
            ("short", 2, true),
            ("unsigned short", 2, false),
            ("int", 4, true),
            ("unsigned int", 4, false),
            ("long", 8, true),
            ("unsigned long", 8, false),
            ("long long", 8, true),
            ("unsigned long long", 8, false),
        ] {
            self.insert(TypeLayout::int(name, size, signed));
        }
        self.insert(TypeLayout::new("bool", 1, TypeKind::Bool));
        self.insert(TypeLayout::new("char", 1, TypeKind::Char));
        self.insert(TypeLayout::new("void", 1, TypeKind::Opaque));
        for (alias, target) in [
            ("size_t", "unsigned long"),
            ("int32_t", "int"),
            ("uint32_t", "unsigned int"),
            ("int64_t", "long"),
            ("uint64_t", "unsigned long"),
        ] {
            self.insert(TypeLayout::typedef(alias, target));
        }

        // libstdc++ std::string with the small-string buffer
        let hider = format!("{}::_Alloc_hider", STD_STRING);
        self.insert(TypeLayout::structure(
            &hider,
            8,
            vec![Field::new("_M_p", 0, "char*")],
        ));
        self.insert(TypeLayout::structure(
            STD_STRING,
            32,
            vec![
                Field::new("_M_dataplus", 0, hider.as_str()),
                Field::new("_M_string_length", 8, "unsigned long"),
                Field::new("_M_local_buf", 16, "char[16]"),
            ],
        ));
        self.insert(TypeLayout::typedef("std::string", STD_STRING));

        self.insert(TypeLayout::structure(
            "mongo::StringData",
            16,
            vec![
                Field::new("_data", 0, "const char*"),
                Field::new("_size", 8, "size_t"),
            ],
        ));

        self.insert(TypeLayout::new(
            "mongo::ErrorCodes::Error",
            4,
            TypeKind::Enum {
                enumerators: ERROR_CODES
                    .iter()
                    .map(|&(name, value)| Enumerator {
                        name: format!("mongo::ErrorCodes::{}", name),
                        value,
                    })
                    .collect(),
            },
        ));
        self.insert(TypeLayout::structure(
            "mongo::Status::ErrorInfo",
            48,
            vec![
                Field::new("refs", 0, "unsigned int"),
                Field::new("code", 4, "mongo::ErrorCodes::Error"),
                Field::new("reason", 8, "std::string"),
                Field::new("location", 40, "int"),
            ],
        ));
        self.insert(TypeLayout::structure(
            "mongo::Status",
            8,
            vec![Field::new("_error", 0, "mongo::Status::ErrorInfo*")],
        ));

        self.insert(TypeLayout::structure(
            "mongo::SharedBuffer::Holder",
            4,
            vec![Field::new("_refCount", 0, "unsigned int")],
        ));
        self.insert(TypeLayout::structure(
            "boost::intrusive_ptr<mongo::SharedBuffer::Holder>",
            8,
            vec![Field::new("px", 0, "mongo::SharedBuffer::Holder*")],
        ));
        self.insert(TypeLayout::structure(
            "mongo::SharedBuffer",
            8,
            vec![Field::new(
                "_holder",
                0,
                "boost::intrusive_ptr<mongo::SharedBuffer::Holder>",
            )],
        ));
        self.insert(TypeLayout::structure(
            "mongo::BSONObj",
            16,
            vec![
                Field::new("_objdata", 0, "const char*"),
                Field::new("_ownedBuffer", 8, "mongo::SharedBuffer"),
            ],
        ));
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Error codes known to the built-in `mongo::ErrorCodes::Error` layout
const ERROR_CODES: &[(&str, i64)] = &[
    ("OK", 0),
    ("InternalError", 1),
    ("BadValue", 2),
    ("NoSuchKey", 4),
    ("GraphContainsCycle", 5),
    ("HostUnreachable", 6),
    ("HostNotFound", 7),
    ("UnknownError", 8),
    ("FailedToParse", 9),
    ("CannotMutateObject", 10),
    ("UserNotFound", 11),
    ("UnsupportedFormat", 12),
    ("Unauthorized", 13),
    ("TypeMismatch", 14),
    ("Overflow", 15),
    ("InvalidLength", 16),
    ("ProtocolError", 17),
    ("AuthenticationFailed", 18),
    ("IllegalOperation", 20),
    ("EmptyArrayOperation", 21),
    ("InvalidBSON", 22),
    ("NamespaceNotFound", 26),
    ("IndexNotFound", 27),
    ("ExceededTimeLimit", 50),
    ("DuplicateKey", 11000),
    ("Interrupted", 11601),
];

fn align_up(value: u64, align: u64) -> u64 {
    let align = align.max(1);
    value.div_ceil(align) * align
}

/// Split `T[N]` into (`T`, N)
fn parse_array_name(name: &str) -> Option<(&str, u64)> {
    let body = name.strip_suffix(']')?;
    let open = body.rfind('[')?;
    let count = body[open + 1..].trim().parse().ok()?;
    Some((body[..open].trim_end(), count))
}
