//! Schema-driven read access
//!
//! [`DynTable`] resolves fields by name through a [`Schema`] instead of by
//! slot, which is what dump tools and tests need when no typed accessors
//! exist. Values borrow both the schema and the buffer.

use std::fmt;

use serde_json::{Map, Number, Value as Json};

use super::{EnumDef, FieldDef, FieldType, Literal, ScalarType, Schema, StructDef, TableDef};
use crate::error::{ReadError, ReadResult};
use crate::layout::SIZE_UOFFSET;
use crate::reader::{self, Table, follow_uoffset, read_scalar, read_str, slice_at};

/// A decoded field value
#[derive(Debug, Clone)]
pub enum Value<'a> {
    /// Offset field not present (scalars read as their default instead)
    Absent,
    Bool(bool),
    /// Every integer type except `u64`
    Int(i64),
    UInt(u64),
    Float(f64),
    Enum {
        value: i64,
        variant: Option<&'a str>,
    },
    String(&'a str),
    Struct(DynStruct<'a>),
    Table(DynTable<'a>),
    Vector(DynVector<'a>),
    Union {
        tag: u8,
        variant: &'a str,
        value: Box<Value<'a>>,
    },
}

impl<'a> Value<'a> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) | Self::Enum { value, .. } => Some(*value),
            Self::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(value) => Some(*value),
            Self::Int(value) | Self::Enum { value, .. } => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            Self::UInt(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Self::String(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<DynTable<'a>> {
        match self {
            Self::Table(table) => Some(*table),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<DynStruct<'a>> {
        match self {
            Self::Struct(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<DynVector<'a>> {
        match self {
            Self::Vector(vector) => Some(*vector),
            _ => None,
        }
    }

    /// JSON rendering for debug dumps. Enums render as their variant name when known.
    pub fn to_json(&self) -> ReadResult<Json> {
        Ok(match self {
            Self::Absent => Json::Null,
            Self::Bool(value) => Json::Bool(*value),
            Self::Int(value) => Json::from(*value),
            Self::UInt(value) => Json::from(*value),
            Self::Float(value) => Number::from_f64(*value).map_or(Json::Null, Json::Number),
            Self::Enum {
                variant: Some(name), ..
            } => Json::String(name.to_string()),
            Self::Enum { value, .. } => Json::from(*value),
            Self::String(value) => Json::String(value.to_string()),
            Self::Struct(value) => value.to_json()?,
            Self::Table(table) => table.to_json()?,
            Self::Vector(vector) => vector.to_json()?,
            Self::Union { variant, value, .. } => {
                let mut object = Map::new();
                object.insert("type".to_string(), Json::String(variant.to_string()));
                object.insert("value".to_string(), value.to_json()?);
                Json::Object(object)
            }
        })
    }
}

// ============================================================================
// Tables
// ============================================================================

/// A table read through its schema definition.
#[derive(Clone, Copy)]
pub struct DynTable<'a> {
    schema: &'a Schema,
    def: &'a TableDef,
    table: Table<'a>,
}

impl fmt::Debug for DynTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynTable")
            .field("name", &self.def.name)
            .field("pos", &self.table.pos())
            .finish()
    }
}

impl<'a> DynTable<'a> {
    pub fn new(schema: &'a Schema, def: &'a TableDef, table: Table<'a>) -> Self {
        Self { schema, def, table }
    }

    /// The schema's root table, checking the file identifier when one is declared.
    pub fn root(schema: &'a Schema, buf: &'a [u8]) -> ReadResult<Self> {
        let def = schema.root().ok_or_else(|| ReadError::UnknownField {
            owner: "schema".to_string(),
            field: "root_table".to_string(),
        })?;
        let table = match schema.identifier() {
            Some(identifier) => reader::root_with_identifier(buf, &identifier)?,
            None => reader::root(buf)?,
        };
        Ok(Self::new(schema, def, table))
    }

    pub fn name(&self) -> &'a str {
        &self.def.name
    }

    pub fn def(&self) -> &'a TableDef {
        self.def
    }

    /// The underlying slot-addressed view
    pub fn raw(&self) -> Table<'a> {
        self.table
    }

    fn field(&self, name: &str) -> ReadResult<&'a FieldDef> {
        self.def.field(name).ok_or_else(|| ReadError::UnknownField {
            owner: self.def.name.clone(),
            field: name.to_string(),
        })
    }

    fn mismatch(field: &FieldDef, expected: &'static str) -> ReadError {
        ReadError::TypeMismatch {
            field: field.name.clone(),
            expected,
            actual: field.ty.kind_name(),
        }
    }

    /// Scalar or enum field, with the schema default applied when absent.
    pub fn scalar(&self, name: &str) -> ReadResult<Value<'a>> {
        let field = self.field(name)?;
        match field.ty {
            FieldType::Scalar(_) | FieldType::Enum(_) => self.field_value(field),
            _ => Err(Self::mismatch(field, "a scalar")),
        }
    }

    pub fn string(&self, name: &str) -> ReadResult<Option<&'a str>> {
        let field = self.field(name)?;
        match field.ty {
            FieldType::String => self.table.get_str(field.slot),
            _ => Err(Self::mismatch(field, "a string")),
        }
    }

    pub fn table(&self, name: &str) -> ReadResult<Option<DynTable<'a>>> {
        let field = self.field(name)?;
        match &field.ty {
            FieldType::Table(_) => Ok(self.field_value(field)?.as_table()),
            _ => Err(Self::mismatch(field, "a table")),
        }
    }

    pub fn vector(&self, name: &str) -> ReadResult<Option<DynVector<'a>>> {
        let field = self.field(name)?;
        match &field.ty {
            FieldType::Vector(_) => Ok(self.field_value(field)?.as_vector()),
            _ => Err(Self::mismatch(field, "a vector")),
        }
    }

    /// Length of a vector field, 0 when absent.
    pub fn vector_len(&self, name: &str) -> ReadResult<usize> {
        Ok(self.vector(name)?.map_or(0, |v| v.len()))
    }

    /// Any field by name.
    pub fn value(&self, name: &str) -> ReadResult<Value<'a>> {
        let field = self.field(name)?;
        self.field_value(field)
    }

    /// Every non-deprecated field as a JSON object (absent offset fields omitted).
    pub fn to_json(&self) -> ReadResult<Json> {
        let mut object = Map::new();
        for field in self.def.fields.iter().filter(|f| !f.deprecated) {
            let value = self.field_value(field)?;
            if value.is_absent() {
                continue;
            }
            object.insert(field.name.clone(), value.to_json()?);
        }
        Ok(Json::Object(object))
    }

    fn field_value(&self, field: &'a FieldDef) -> ReadResult<Value<'a>> {
        let buf = self.table.buf();
        match &field.ty {
            FieldType::Union(name) => self.union_value(field, name),
            ty if ty.is_offset() => match self.table.field_target(field.slot)? {
                Some(target) => referenced_value(self.schema, buf, target, ty),
                None => Ok(Value::Absent),
            },
            ty => match self.table.field_pos(field.slot)? {
                Some(pos) => inline_value(self.schema, buf, pos, ty),
                None => default_value(self.schema, field),
            },
        }
    }

    fn union_value(&self, field: &'a FieldDef, union: &str) -> ReadResult<Value<'a>> {
        let Some(tag_slot) = field.union_tag_slot() else {
            return Err(Self::mismatch(field, "a union with a tag slot"));
        };
        let tag = self.table.get::<u8>(tag_slot, 0)?;
        if tag == 0 {
            return Ok(Value::Absent);
        }
        let def = self.schema.union(union).ok_or_else(|| unknown_type(union))?;
        let variant = def.variant(tag).ok_or_else(|| ReadError::UnknownUnionTag {
            union: union.to_string(),
            tag,
        })?;
        let Some(target) = self.table.field_target(field.slot)? else {
            return Ok(Value::Absent);
        };
        let buf = self.table.buf();
        let value = if let Some(table) = self.schema.table(&variant.name) {
            Value::Table(DynTable::new(self.schema, table, Table::new(buf, target)?))
        } else {
            let def = self
                .schema
                .structure(&variant.name)
                .ok_or_else(|| unknown_type(&variant.name))?;
            Value::Struct(DynStruct::new(self.schema, def, slice_at(buf, target, def.size)?))
        };
        Ok(Value::Union {
            tag,
            variant: &variant.name,
            value: Box::new(value),
        })
    }
}

// ============================================================================
// Structs
// ============================================================================

/// A struct read through its schema definition.
#[derive(Clone, Copy)]
pub struct DynStruct<'a> {
    schema: &'a Schema,
    def: &'a StructDef,
    bytes: &'a [u8],
}

impl fmt::Debug for DynStruct<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynStruct")
            .field("name", &self.def.name)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl<'a> DynStruct<'a> {
    pub fn new(schema: &'a Schema, def: &'a StructDef, bytes: &'a [u8]) -> Self {
        Self { schema, def, bytes }
    }

    pub fn name(&self) -> &'a str {
        &self.def.name
    }

    /// Raw encoded bytes
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn field(&self, name: &str) -> ReadResult<Value<'a>> {
        let member = self.def.field(name).ok_or_else(|| ReadError::UnknownField {
            owner: self.def.name.clone(),
            field: name.to_string(),
        })?;
        inline_value(self.schema, self.bytes, member.offset, &member.ty)
    }

    pub fn to_json(&self) -> ReadResult<Json> {
        let mut object = Map::new();
        for member in &self.def.fields {
            let value = inline_value(self.schema, self.bytes, member.offset, &member.ty)?;
            object.insert(member.name.clone(), value.to_json()?);
        }
        Ok(Json::Object(object))
    }
}

// ============================================================================
// Vectors
// ============================================================================

/// A vector read through its element type.
#[derive(Clone, Copy)]
pub struct DynVector<'a> {
    schema: &'a Schema,
    elem: &'a FieldType,
    elem_size: usize,
    buf: &'a [u8],
    pos: usize,
    len: usize,
}

impl fmt::Debug for DynVector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynVector")
            .field("elem", &self.elem.to_string())
            .field("pos", &self.pos)
            .field("len", &self.len)
            .finish()
    }
}

impl<'a> DynVector<'a> {
    /// A vector of `elem` whose length prefix sits at `pos`.
    pub fn at(schema: &'a Schema, elem: &'a FieldType, buf: &'a [u8], pos: usize) -> ReadResult<Self> {
        let elem_size = schema
            .inline_size(elem)
            .ok_or_else(|| unknown_type(&elem.to_string()))?;
        let len = read_scalar::<u32>(buf, pos)? as usize;
        let body = len.checked_mul(elem_size).ok_or(ReadError::OutOfBounds {
            pos,
            len: usize::MAX,
            buffer_len: buf.len(),
        })?;
        slice_at(buf, pos + SIZE_UOFFSET, body)?;
        Ok(Self {
            schema,
            elem,
            elem_size,
            buf,
            pos,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn element_type(&self) -> &'a FieldType {
        self.elem
    }

    pub fn get(&self, index: usize) -> ReadResult<Value<'a>> {
        if index >= self.len {
            return Err(ReadError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let pos = self.pos + SIZE_UOFFSET + index * self.elem_size;
        if self.elem.is_offset() {
            referenced_value(self.schema, self.buf, follow_uoffset(self.buf, pos)?, self.elem)
        } else {
            inline_value(self.schema, self.buf, pos, self.elem)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ReadResult<Value<'a>>> + 'a {
        let vector = *self;
        (0..vector.len).map(move |index| vector.get(index))
    }

    pub fn to_json(&self) -> ReadResult<Json> {
        self.iter()
            .map(|item| item?.to_json())
            .collect::<ReadResult<Vec<_>>>()
            .map(Json::Array)
    }
}

// ============================================================================
// Decoding helpers
// ============================================================================

fn unknown_type(name: &str) -> ReadError {
    ReadError::UnknownField {
        owner: "schema".to_string(),
        field: name.to_string(),
    }
}

fn scalar_value<'a>(buf: &'a [u8], pos: usize, ty: ScalarType) -> ReadResult<Value<'a>> {
    Ok(match ty {
        ScalarType::Bool => Value::Bool(read_scalar::<bool>(buf, pos)?),
        ScalarType::I8 => Value::Int(read_scalar::<i8>(buf, pos)? as i64),
        ScalarType::U8 => Value::Int(read_scalar::<u8>(buf, pos)? as i64),
        ScalarType::I16 => Value::Int(read_scalar::<i16>(buf, pos)? as i64),
        ScalarType::U16 => Value::Int(read_scalar::<u16>(buf, pos)? as i64),
        ScalarType::I32 => Value::Int(read_scalar::<i32>(buf, pos)? as i64),
        ScalarType::U32 => Value::Int(read_scalar::<u32>(buf, pos)? as i64),
        ScalarType::I64 => Value::Int(read_scalar::<i64>(buf, pos)?),
        ScalarType::U64 => Value::UInt(read_scalar::<u64>(buf, pos)?),
        ScalarType::F32 => Value::Float(read_scalar::<f32>(buf, pos)? as f64),
        ScalarType::F64 => Value::Float(read_scalar::<f64>(buf, pos)?),
    })
}

fn literal_value<'a>(ty: ScalarType, literal: Option<Literal>) -> Value<'a> {
    match (ty, literal) {
        (ScalarType::Bool, Some(Literal::Bool(value))) => Value::Bool(value),
        (ScalarType::Bool, Some(Literal::Int(value))) => Value::Bool(value != 0),
        (ScalarType::Bool, _) => Value::Bool(false),
        (ScalarType::U64, Some(Literal::Int(value))) => Value::UInt(value as u64),
        (ScalarType::U64, _) => Value::UInt(0),
        (ty, Some(Literal::Float(value))) if ty.is_float() => Value::Float(value),
        (ty, Some(Literal::Int(value))) if ty.is_float() => Value::Float(value as f64),
        (ty, _) if ty.is_float() => Value::Float(0.0),
        (_, Some(Literal::Int(value))) => Value::Int(value),
        _ => Value::Int(0),
    }
}

fn enum_value<'a>(def: &'a EnumDef, value: i64) -> Value<'a> {
    Value::Enum {
        value,
        variant: def.name_of(value),
    }
}

fn default_value<'a>(schema: &'a Schema, field: &'a FieldDef) -> ReadResult<Value<'a>> {
    match &field.ty {
        FieldType::Scalar(ty) => Ok(literal_value(*ty, field.default)),
        FieldType::Enum(name) => {
            let def = schema.enumeration(name).ok_or_else(|| unknown_type(name))?;
            let value = literal_value(def.underlying, field.default).as_i64().unwrap_or(0);
            Ok(enum_value(def, value))
        }
        _ => Ok(Value::Absent),
    }
}

/// Value stored inline at `pos` (scalar, enum or struct).
fn inline_value<'a>(schema: &'a Schema, buf: &'a [u8], pos: usize, ty: &'a FieldType) -> ReadResult<Value<'a>> {
    match ty {
        FieldType::Scalar(scalar) => scalar_value(buf, pos, *scalar),
        FieldType::Enum(name) => {
            let def = schema.enumeration(name).ok_or_else(|| unknown_type(name))?;
            let value = scalar_value(buf, pos, def.underlying)?.as_i64().unwrap_or(0);
            Ok(enum_value(def, value))
        }
        FieldType::Struct(name) => {
            let def = schema.structure(name).ok_or_else(|| unknown_type(name))?;
            Ok(Value::Struct(DynStruct::new(schema, def, slice_at(buf, pos, def.size)?)))
        }
        other => Err(unknown_type(&other.to_string())),
    }
}

/// Value referenced by a uoffset whose target is `target` (string, table or vector).
fn referenced_value<'a>(
    schema: &'a Schema,
    buf: &'a [u8],
    target: usize,
    ty: &'a FieldType,
) -> ReadResult<Value<'a>> {
    match ty {
        FieldType::String => Ok(Value::String(read_str(buf, target)?)),
        FieldType::Table(name) => {
            let def = schema.table(name).ok_or_else(|| unknown_type(name))?;
            Ok(Value::Table(DynTable::new(schema, def, Table::new(buf, target)?)))
        }
        FieldType::Vector(elem) => Ok(Value::Vector(DynVector::at(schema, elem, buf, target)?)),
        other => Err(unknown_type(&other.to_string())),
    }
}
