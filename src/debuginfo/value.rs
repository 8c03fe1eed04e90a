//! Typed values
//!
//! A [`Value`] is an address plus the layout of what lives there. All reads
//! go straight to target memory; nothing is cached between calls.

use super::layout::{TypeKind, TypeLayout};
use super::registry::TypeRegistry;
use super::{InspectError, TypeError};
use crate::core::memory::TargetMemory;
use std::fmt;
use std::rc::Rc;

/// Memory plus type information for one inspection
#[derive(Clone, Copy)]
pub struct Inspector<'a> {
    memory: &'a dyn TargetMemory,
    types: &'a TypeRegistry,
}

impl<'a> Inspector<'a> {
    pub fn new(memory: &'a dyn TargetMemory, types: &'a TypeRegistry) -> Self {
        Self { memory, types }
    }

    pub fn memory(&self) -> &'a dyn TargetMemory {
        self.memory
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    /// View the object at `address` as `type_name`
    pub fn value_at(&self, address: u64, type_name: &str) -> Result<Value<'a>, TypeError> {
        let declared = self.types.lookup(type_name)?;
        let layout = self.types.resolve(type_name)?;
        Ok(Value {
            inspector: *self,
            address,
            declared,
            layout,
        })
    }
}

/// Typed handle into target memory
#[derive(Clone)]
pub struct Value<'a> {
    inspector: Inspector<'a>,
    address: u64,
    /// Type as named by the referrer (may be a typedef)
    declared: Rc<TypeLayout>,
    /// `declared` with typedefs stripped
    layout: Rc<TypeLayout>,
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) @ {:#x}", self.declared.name, self.address)
    }
}

impl<'a> Value<'a> {
    pub fn inspector(&self) -> Inspector<'a> {
        self.inspector
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    /// Declared type name
    pub fn type_name(&self) -> &str {
        &self.declared.name
    }

    /// Type name with typedefs stripped
    pub fn resolved_type_name(&self) -> &str {
        &self.layout.name
    }

    pub fn layout(&self) -> &TypeLayout {
        &self.layout
    }

    pub fn size(&self) -> u64 {
        self.layout.size
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.layout.field(name).is_some()
    }

    /// Member `name` of a struct value
    pub fn field(&self, name: &str) -> Result<Value<'a>, TypeError> {
        if !matches!(self.layout.kind, TypeKind::Struct { .. }) {
            return Err(TypeError::NotAStruct(self.layout.name.clone()));
        }
        let field = self
            .layout
            .field(name)
            .ok_or_else(|| TypeError::NoSuchField {
                ty: self.layout.name.clone(),
                field: name.to_string(),
            })?;
        self.inspector
            .value_at(self.address + field.offset, &field.ty)
    }

    /// Reinterpret the same address as another type
    pub fn cast(&self, type_name: &str) -> Result<Value<'a>, TypeError> {
        self.inspector.value_at(self.address, type_name)
    }

    /// Raw integer contents (integers, bools, chars, enums, pointers)
    pub fn as_u64(&self) -> Result<u64, InspectError> {
        match self.layout.kind {
            TypeKind::Int { .. }
            | TypeKind::Bool
            | TypeKind::Char
            | TypeKind::Enum { .. }
            | TypeKind::Pointer { .. } => Ok(self
                .inspector
                .memory
                .read_uint(self.address, self.layout.size as usize)?),
            _ => Err(TypeError::NotAnInteger(self.layout.name.clone()).into()),
        }
    }

    /// Integer contents reinterpreted as a signed number of the same width,
    /// so an all-ones `size_t` reads as `-1`
    pub fn as_i64(&self) -> Result<i64, InspectError> {
        let raw = self.as_u64()?;
        let bits = (self.layout.size.clamp(1, 8) * 8) as u32;
        if bits == 64 {
            return Ok(raw as i64);
        }
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Integer contents honouring the declared signedness
    pub fn as_int(&self) -> Result<i128, InspectError> {
        let signed = match self.layout.kind {
            TypeKind::Int { signed } => signed,
            TypeKind::Enum { .. } | TypeKind::Char => true,
            _ => false,
        };
        if signed {
            Ok(self.as_i64()? as i128)
        } else {
            Ok(self.as_u64()? as i128)
        }
    }

    pub fn as_bool(&self) -> Result<bool, InspectError> {
        Ok(self.as_u64()? != 0)
    }

    /// Address held by a pointer, or by a smart pointer exposing `px`
    pub fn pointer_value(&self) -> Result<u64, InspectError> {
        match &self.layout.kind {
            TypeKind::Pointer { .. } => self.as_u64(),
            TypeKind::Struct { .. } if self.has_field("px") => self.field("px")?.pointer_value(),
            _ => Err(TypeError::NotAPointer(self.layout.name.clone()).into()),
        }
    }

    pub fn is_null(&self) -> Result<bool, InspectError> {
        Ok(self.pointer_value()? == 0)
    }

    /// Pointee type name of a pointer or smart pointer
    pub fn target_type(&self) -> Result<String, InspectError> {
        match &self.layout.kind {
            TypeKind::Pointer { target } => Ok(target.clone()),
            TypeKind::Struct { .. } if self.has_field("px") => self.field("px")?.target_type(),
            _ => Err(TypeError::NotAPointer(self.layout.name.clone()).into()),
        }
    }

    /// The object a pointer refers to. Null is not checked here; reading the
    /// result fails like any other unmapped read.
    pub fn deref(&self) -> Result<Value<'a>, InspectError> {
        let target = self.target_type()?;
        let address = self.pointer_value()?;
        Ok(self.inspector.value_at(address, &target)?)
    }

    /// `self[index]` for arrays, and pointer arithmetic for pointers
    pub fn element(&self, index: u64) -> Result<Value<'a>, InspectError> {
        let (base, element) = match &self.layout.kind {
            TypeKind::Array { element, .. } => (self.address, element.clone()),
            TypeKind::Pointer { .. } => (self.pointer_value()?, self.target_type()?),
            TypeKind::Struct { .. } if self.has_field("px") => {
                (self.pointer_value()?, self.target_type()?)
            }
            _ => return Err(TypeError::NotAPointer(self.layout.name.clone()).into()),
        };
        let stride = self.inspector.types.resolve(&element)?.size;
        Ok(self
            .inspector
            .value_at(base.wrapping_add(index.wrapping_mul(stride)), &element)?)
    }

    /// Enumerator name, or the number when it is not a known enumerator
    pub fn enum_text(&self) -> Result<String, InspectError> {
        let raw = self.as_i64()?;
        Ok(match self.layout.enumerator(raw) {
            Some(name) => name.to_string(),
            None => raw.to_string(),
        })
    }

    /// The object's bytes
    pub fn bytes(&self) -> Result<Vec<u8>, InspectError> {
        Ok(self
            .inspector
            .memory
            .read(self.address, self.layout.size as usize)?)
    }

    /// Exactly `len` bytes at the address held by this pointer
    pub fn read_pointee_bytes(&self, len: usize) -> Result<Vec<u8>, InspectError> {
        let address = self.pointer_value()?;
        Ok(self.inspector.memory.read(address, len)?)
    }

    /// NUL-terminated string at the address held by this pointer
    pub fn read_c_string(&self, max_len: usize) -> Result<Vec<u8>, InspectError> {
        let address = self.pointer_value()?;
        Ok(self.inspector.memory.read_c_string(address, max_len)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::{MemoryError, SnapshotMemory};
    use crate::debuginfo::layout::Field;

    fn registry() -> TypeRegistry {
        let mut types = TypeRegistry::builtin();
        types.insert(TypeLayout::structure(
            "Node",
            16,
            vec![
                Field::new("value", 0, "int"),
                Field::new("flag", 4, "bool"),
                Field::new("next", 8, "Node*"),
            ],
        ));
        types
    }

    fn node_image() -> SnapshotMemory {
        let mut mem = SnapshotMemory::new();
        let mut first = Vec::new();
        first.extend_from_slice(&(-7i32).to_le_bytes());
        first.extend_from_slice(&[1, 0, 0, 0]);
        first.extend_from_slice(&0x2000u64.to_le_bytes());
        let mut second = Vec::new();
        second.extend_from_slice(&42i32.to_le_bytes());
        second.extend_from_slice(&[0, 0, 0, 0]);
        second.extend_from_slice(&0u64.to_le_bytes());
        mem.map(0x1000, first).map(0x2000, second);
        mem
    }

    #[test]
    fn test_field_and_deref() {
        let types = registry();
        let mem = node_image();
        let inspector = Inspector::new(&mem, &types);

        let node = inspector.value_at(0x1000, "Node").unwrap();
        assert_eq!(node.field("value").unwrap().as_i64().unwrap(), -7);
        assert!(node.field("flag").unwrap().as_bool().unwrap());

        let next = node.field("next").unwrap().deref().unwrap();
        assert_eq!(next.address(), 0x2000);
        assert_eq!(next.field("value").unwrap().as_int().unwrap(), 42);
        assert!(next.field("next").unwrap().is_null().unwrap());
    }

    #[test]
    fn test_missing_field_and_non_struct() {
        let types = registry();
        let mem = node_image();
        let inspector = Inspector::new(&mem, &types);

        let node = inspector.value_at(0x1000, "Node").unwrap();
        assert!(matches!(
            node.field("prev"),
            Err(TypeError::NoSuchField { .. })
        ));
        let value = node.field("value").unwrap();
        assert!(matches!(value.field("x"), Err(TypeError::NotAStruct(_))));
        assert!(matches!(
            value.deref(),
            Err(InspectError::Type(TypeError::NotAPointer(_)))
        ));
    }

    #[test]
    fn test_null_deref_fails_on_read() {
        let types = registry();
        let mem = node_image();
        let inspector = Inspector::new(&mem, &types);

        let last = inspector.value_at(0x2000, "Node").unwrap();
        let nothing = last.field("next").unwrap().deref().unwrap();
        assert!(matches!(
            nothing.field("value").unwrap().as_i64(),
            Err(InspectError::Memory(MemoryError::Unmapped { address: 0 }))
        ));
    }

    #[test]
    fn test_sign_reinterpretation() {
        let types = TypeRegistry::builtin();
        let mut mem = SnapshotMemory::new();
        mem.map(0x1000, u64::MAX.to_le_bytes().to_vec());
        let inspector = Inspector::new(&mem, &types);

        let size = inspector.value_at(0x1000, "size_t").unwrap();
        assert_eq!(size.as_u64().unwrap(), u64::MAX);
        assert_eq!(size.as_i64().unwrap(), -1);
        assert_eq!(size.as_int().unwrap(), u64::MAX as i128);

        let short = inspector.value_at(0x1000, "unsigned short").unwrap();
        assert_eq!(short.as_u64().unwrap(), 0xffff);
        assert_eq!(short.as_i64().unwrap(), -1);
    }

    #[test]
    fn test_pointer_arithmetic_and_cast() {
        let types = TypeRegistry::builtin();
        let mut mem = SnapshotMemory::new();
        mem.map(0x1000, 0x2000u64.to_le_bytes().to_vec());
        let ints: Vec<u8> = [10i32, 20, 30].iter().flat_map(|v| v.to_le_bytes()).collect();
        mem.map(0x2000, ints);
        let inspector = Inspector::new(&mem, &types);

        let ptr = inspector.value_at(0x1000, "int*").unwrap();
        assert_eq!(ptr.element(2).unwrap().as_i64().unwrap(), 30);

        let array = inspector.value_at(0x2000, "int[3]").unwrap();
        assert_eq!(array.element(1).unwrap().as_i64().unwrap(), 20);

        let as_long = array.cast("long").unwrap();
        assert_eq!(as_long.as_i64().unwrap(), 10 | (20 << 32));
    }

    #[test]
    fn test_enum_text() {
        let types = TypeRegistry::builtin();
        let mut mem = SnapshotMemory::new();
        mem.map(0x1000, [2i32, 9999].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>());
        let inspector = Inspector::new(&mem, &types);

        let known = inspector
            .value_at(0x1000, "mongo::ErrorCodes::Error")
            .unwrap();
        assert_eq!(known.enum_text().unwrap(), "mongo::ErrorCodes::BadValue");

        let unknown = inspector
            .value_at(0x1004, "mongo::ErrorCodes::Error")
            .unwrap();
        assert_eq!(unknown.enum_text().unwrap(), "9999");
    }
}
