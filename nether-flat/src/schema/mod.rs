//! Schema descriptors as data
//!
//! A schema names every table, struct, enum and union of a buffer format and
//! maps table fields to vtable slots. Schemas are plain TOML documents:
//!
//! ```toml
//! file_identifier = "NTRC"
//! root_table = "Profile"
//!
//! [[tables]]
//! name = "Profile"
//! fields = [
//!     { name = "name", slot = 0, type = "string", required = true },
//!     { name = "events", slot = 1, type = "[Event]" },
//! ]
//!
//! [[tables]]
//! name = "Event"
//! fields = [
//!     { name = "at", slot = 0, type = "i32" },
//!     { name = "kind", slot = 1, type = "u8", default = 3 },
//! ]
//! ```
//!
//! A union field occupies two slots: its `u8` tag in `slot - 1` and the value
//! reference in `slot`.
//!
//! Schemas drive the [`Verifier`](crate::Verifier), the [`DynTable`] reader and
//! the [`DynBuilder`].

mod dyn_builder;
mod dynamic;


pub use dyn_builder::DynBuilder;
pub use dynamic::{DynStruct, DynTable, DynVector, Value};

use std::fmt;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::layout::{FILE_IDENTIFIER_LENGTH, MAX_SLOT, SIZE_UOFFSET};

// ============================================================================
// Types
// ============================================================================

/// Fixed-width scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScalarType {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarType {
    /// Parse a scalar type name (Rust names or the classic aliases).
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "i8" | "byte" => Self::I8,
            "u8" | "ubyte" => Self::U8,
            "i16" | "short" => Self::I16,
            "u16" | "ushort" => Self::U16,
            "i32" | "int" => Self::I32,
            "u32" | "uint" => Self::U32,
            "i64" | "long" => Self::I64,
            "u64" | "ulong" => Self::U64,
            "f32" | "float" => Self::F32,
            "f64" | "double" => Self::F64,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Encoded width (and alignment) in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Whether the integer `value` is representable in this type
    pub fn holds_int(self, value: i64) -> bool {
        match self {
            Self::Bool => false,
            Self::I8 => i8::try_from(value).is_ok(),
            Self::U8 => u8::try_from(value).is_ok(),
            Self::I16 => i16::try_from(value).is_ok(),
            Self::U16 => u16::try_from(value).is_ok(),
            Self::I32 => i32::try_from(value).is_ok(),
            Self::U32 => u32::try_from(value).is_ok(),
            Self::U64 => value >= 0,
            Self::I64 | Self::F32 | Self::F64 => true,
        }
    }
}

impl TryFrom<String> for ScalarType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("`{value}` is not a scalar type"))
    }
}

impl From<ScalarType> for String {
    fn from(value: ScalarType) -> Self {
        value.name().to_string()
    }
}

/// Type of a table field, struct member or vector element.
///
/// Written in schemas as `"u16"`, `"string"`, `"[Element]"` or a declared name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    Scalar(ScalarType),
    String,
    Vector(Box<FieldType>),
    Table(String),
    Struct(String),
    Union(String),
    Enum(String),
    /// A declared name not yet resolved; only present before validation
    Named(String),
}

impl FieldType {
    /// Parse a type expression.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let expr = expr.trim();
        if let Some(inner) = expr.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated vector type `{expr}`"))?;
            return Ok(Self::Vector(Box::new(Self::parse(inner)?)));
        }
        if expr.is_empty() {
            return Err("empty type".to_string());
        }
        if expr == "string" {
            return Ok(Self::String);
        }
        if let Some(scalar) = ScalarType::parse(expr) {
            return Ok(Self::Scalar(scalar));
        }
        if !expr.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            return Err(format!("invalid type name `{expr}`"));
        }
        Ok(Self::Named(expr.to_string()))
    }

    /// Short kind name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "a scalar",
            Self::String => "a string",
            Self::Vector(_) => "a vector",
            Self::Table(_) => "a table",
            Self::Struct(_) => "a struct",
            Self::Union(_) => "a union",
            Self::Enum(_) => "an enum",
            Self::Named(_) => "unresolved",
        }
    }

    /// Whether the field is stored as a uoffset to out-of-line data
    pub fn is_offset(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Vector(_) | Self::Table(_) | Self::Union(_)
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => f.write_str(scalar.name()),
            Self::String => f.write_str("string"),
            Self::Vector(inner) => write!(f, "[{inner}]"),
            Self::Table(name)
            | Self::Struct(name)
            | Self::Union(name)
            | Self::Enum(name)
            | Self::Named(name) => f.write_str(name),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

/// A scalar literal: a field default in a schema, or a value handed to the
/// [`DynBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! literal_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Literal {
                fn from(value: $ty) -> Self {
                    Self::Int(value as i64)
                }
            }
        )*
    };
}

literal_from_int!(i8, u8, i16, u16, i32, u32, i64);

impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Self::Float(value as f64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// One field of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Vtable slot (value slot for unions)
    pub slot: u16,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub default: Option<Literal>,
    /// Must be present in every table instance
    #[serde(default)]
    pub required: bool,
    /// Kept for slot compatibility, no longer written
    #[serde(default)]
    pub deprecated: bool,
}

impl FieldDef {
    /// Slot holding the tag of a union field
    pub fn union_tag_slot(&self) -> Option<u16> {
        match self.ty {
            FieldType::Union(_) => self.slot.checked_sub(1),
            _ => None,
        }
    }
}

/// A table: named fields mapped to vtable slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl TableDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of slots a table instance needs (highest slot + 1)
    pub fn slot_count(&self) -> u16 {
        self.fields.iter().map(|f| f.slot.saturating_add(1)).max().unwrap_or(0)
    }

    /// Slots that must be present (union fields require their value slot)
    pub fn required_slots(&self) -> Vec<u16> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.slot)
            .collect()
    }
}

/// One member of a struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructFieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    /// Byte offset inside the struct
    pub offset: usize,
}

/// A fixed-size struct with explicit member offsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    /// Encoded size including trailing padding
    pub size: usize,
    pub align: usize,
    #[serde(default)]
    pub fields: Vec<StructFieldDef>,
}

impl StructDef {
    pub fn field(&self, name: &str) -> Option<&StructFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

/// Named integer constants stored as their underlying scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub underlying: ScalarType,
    #[serde(default)]
    pub values: Vec<EnumValue>,
}

impl EnumDef {
    /// Name of the constant with `value`
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.name.as_str())
    }
}

/// One member of a union: a table or struct selected by a non-zero tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionVariant {
    /// Name of the table or struct
    pub name: String,
    pub tag: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDef {
    pub name: String,
    #[serde(default)]
    pub variants: Vec<UnionVariant>,
}

impl UnionDef {
    pub fn variant(&self, tag: u8) -> Option<&UnionVariant> {
        self.variants.iter().find(|v| v.tag == tag)
    }

    pub fn variant_named(&self, name: &str) -> Option<&UnionVariant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// A complete buffer format
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub namespace: Option<String>,
    /// 4-byte identifier written after the root offset
    #[serde(default)]
    pub file_identifier: Option<String>,
    #[serde(default)]
    pub root_table: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub unions: Vec<UnionDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Table,
    Struct,
    Enum,
    Union,
}

impl Schema {
    /// Parse and validate a TOML schema.
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let mut schema: Schema = toml::from_str(content)?;
        schema.validate()?;
        tracing::debug!(
            tables = schema.tables.len(),
            structs = schema.structs.len(),
            unions = schema.unions.len(),
            "loaded schema"
        );
        Ok(schema)
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn structure(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn union(&self, name: &str) -> Option<&UnionDef> {
        self.unions.iter().find(|u| u.name == name)
    }

    /// Root table definition
    pub fn root(&self) -> Option<&TableDef> {
        self.table(self.root_table.as_deref()?)
    }

    /// File identifier as bytes
    pub fn identifier(&self) -> Option<[u8; FILE_IDENTIFIER_LENGTH]> {
        let bytes = self.file_identifier.as_ref()?.as_bytes();
        bytes.try_into().ok()
    }

    /// Inline size of a value of type `ty` (uoffset size for references)
    pub fn inline_size(&self, ty: &FieldType) -> Option<usize> {
        match ty {
            FieldType::Scalar(scalar) => Some(scalar.size()),
            FieldType::Enum(name) => Some(self.enumeration(name)?.underlying.size()),
            FieldType::Struct(name) => Some(self.structure(name)?.size),
            FieldType::String | FieldType::Vector(_) | FieldType::Table(_) | FieldType::Union(_) => {
                Some(SIZE_UOFFSET)
            }
            FieldType::Named(_) => None,
        }
    }

    /// Required alignment of a value of type `ty`
    pub fn inline_align(&self, ty: &FieldType) -> Option<usize> {
        match ty {
            FieldType::Struct(name) => Some(self.structure(name)?.align),
            other => self.inline_size(other),
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Resolve type names and check the schema is self-consistent.
    pub fn validate(&mut self) -> Result<(), SchemaError> {
        let kinds = self.collect_names()?;

        if let Some(identifier) = &self.file_identifier
            && identifier.len() != FILE_IDENTIFIER_LENGTH
        {
            return Err(SchemaError::InvalidIdentifier(identifier.clone()));
        }
        if let Some(root) = &self.root_table
            && kinds.get(root.as_str()) != Some(&Kind::Table)
        {
            return Err(SchemaError::UnknownRoot(root.clone()));
        }

        for def in &self.enums {
            if !def.underlying.is_integer() {
                return Err(SchemaError::InvalidDefinition {
                    name: def.name.clone(),
                    reason: "enum underlying type must be an integer".to_string(),
                });
            }
        }

        for def in &mut self.structs {
            for field in &mut def.fields {
                resolve(&mut field.ty, &kinds, &def.name, &field.name)?;
                if !matches!(
                    field.ty,
                    FieldType::Scalar(_) | FieldType::Enum(_) | FieldType::Struct(_)
                ) {
                    return Err(SchemaError::InvalidType {
                        owner: def.name.clone(),
                        field: field.name.clone(),
                        reason: "struct members must be scalars, enums or structs",
                    });
                }
            }
        }

        for def in &mut self.tables {
            for field in &mut def.fields {
                resolve(&mut field.ty, &kinds, &def.name, &field.name)?;
            }
        }

        for def in &self.structs {
            self.check_struct(def)?;
        }
        for def in &self.unions {
            self.check_union(def, &kinds)?;
        }
        for def in &self.tables {
            self.check_table(def)?;
        }
        Ok(())
    }

    fn collect_names(&self) -> Result<HashMap<String, Kind>, SchemaError> {
        let mut kinds = HashMap::new();
        let declared = self
            .tables
            .iter()
            .map(|d| (d.name.as_str(), Kind::Table))
            .chain(self.structs.iter().map(|d| (d.name.as_str(), Kind::Struct)))
            .chain(self.enums.iter().map(|d| (d.name.as_str(), Kind::Enum)))
            .chain(self.unions.iter().map(|d| (d.name.as_str(), Kind::Union)));
        for (name, kind) in declared {
            if kinds.insert(name.to_string(), kind).is_some() {
                return Err(SchemaError::DuplicateName {
                    kind: "type",
                    name: name.to_string(),
                });
            }
        }
        Ok(kinds)
    }

    fn check_struct(&self, def: &StructDef) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidDefinition {
            name: def.name.clone(),
            reason,
        };
        if !def.align.is_power_of_two() || def.size == 0 || def.size % def.align != 0 {
            return Err(invalid(format!(
                "size {} must be a non-zero multiple of the power-of-two alignment {}",
                def.size, def.align
            )));
        }
        for field in &def.fields {
            if let FieldType::Struct(name) = &field.ty
                && name == &def.name
            {
                return Err(invalid(format!("`{}` contains itself", field.name)));
            }
            let size = self.inline_size(&field.ty).unwrap_or(0);
            let align = self.inline_align(&field.ty).unwrap_or(1);
            if field.offset.checked_add(size).is_none_or(|end| end > def.size) {
                return Err(invalid(format!("member `{}` extends past the struct", field.name)));
            }
            if field.offset % align != 0 || align > def.align {
                return Err(invalid(format!("member `{}` is misaligned", field.name)));
            }
        }
        Ok(())
    }

    fn check_union(&self, def: &UnionDef, kinds: &HashMap<String, Kind>) -> Result<(), SchemaError> {
        let mut tags = [false; 256];
        for variant in &def.variants {
            let reason = if variant.tag == 0 {
                Some("tag 0 is reserved for NONE".to_string())
            } else if tags[variant.tag as usize] {
                Some(format!("tag {} used twice", variant.tag))
            } else if !matches!(kinds.get(variant.name.as_str()), Some(Kind::Table | Kind::Struct)) {
                Some(format!("variant `{}` is not a table or struct", variant.name))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(SchemaError::InvalidDefinition {
                    name: def.name.clone(),
                    reason,
                });
            }
            tags[variant.tag as usize] = true;
        }
        Ok(())
    }

    fn check_table(&self, def: &TableDef) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        let mut slots = HashSet::new();

        for field in &def.fields {
            let invalid_type = |reason: &'static str| SchemaError::InvalidType {
                owner: def.name.clone(),
                field: field.name.clone(),
                reason,
            };

            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateName {
                    kind: "field",
                    name: format!("{}.{}", def.name, field.name),
                });
            }

            if field.slot > MAX_SLOT {
                return Err(invalid_type("slot exceeds the vtable range"));
            }

            let mut used = vec![field.slot];
            if let FieldType::Union(_) = field.ty {
                let tag_slot = field
                    .union_tag_slot()
                    .ok_or_else(|| invalid_type("union fields need a tag slot before the value slot"))?;
                used.push(tag_slot);
            }
            for slot in used {
                if !slots.insert(slot) {
                    return Err(SchemaError::DuplicateSlot {
                        table: def.name.clone(),
                        slot,
                    });
                }
            }

            if let FieldType::Vector(inner) = &field.ty
                && matches!(**inner, FieldType::Vector(_) | FieldType::Union(_))
            {
                return Err(invalid_type("vectors of vectors or unions are not supported"));
            }

            if let Some(default) = field.default {
                let scalar = match &field.ty {
                    FieldType::Scalar(scalar) => Some(*scalar),
                    FieldType::Enum(name) => self.enumeration(name).map(|e| e.underlying),
                    _ => None,
                };
                let fits = match (scalar, default) {
                    (Some(ScalarType::Bool), Literal::Bool(_)) => true,
                    (Some(s), Literal::Int(value)) => s.holds_int(value),
                    (Some(s), Literal::Float(_)) => s.is_float(),
                    _ => false,
                };
                if !fits {
                    return Err(SchemaError::InvalidDefault {
                        table: def.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn resolve(
    ty: &mut FieldType,
    kinds: &HashMap<String, Kind>,
    owner: &str,
    field: &str,
) -> Result<(), SchemaError> {
    match ty {
        FieldType::Vector(inner) => resolve(inner, kinds, owner, field),
        FieldType::Named(name) => {
            let resolved = match kinds.get(name.as_str()) {
                Some(Kind::Table) => FieldType::Table(name.clone()),
                Some(Kind::Struct) => FieldType::Struct(name.clone()),
                Some(Kind::Enum) => FieldType::Enum(name.clone()),
                Some(Kind::Union) => FieldType::Union(name.clone()),
                None => {
                    return Err(SchemaError::UnknownType {
                        owner: owner.to_string(),
                        field: field.to_string(),
                        name: name.clone(),
                    });
                }
            };
            *ty = resolved;
            Ok(())
        }
        _ => Ok(()),
    }
}
