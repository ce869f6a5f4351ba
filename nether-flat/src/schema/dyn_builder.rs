//! Schema-driven construction
//!
//! Thin layer over [`FlatBuilder`] that resolves field names to slots and
//! defaults, and checks values against the declared field types. Strings and
//! vectors are still created through [`DynBuilder::builder`].

use super::{FieldDef, FieldType, Literal, ScalarType, Schema, TableDef};
use crate::builder::FlatBuilder;
use crate::error::SchemaError;
use crate::layout::{Offset, TableOffset};
use crate::structs::FlatStruct;

/// Builds tables of a [`Schema`] by field name.
#[derive(Debug)]
pub struct DynBuilder<'s> {
    schema: &'s Schema,
    builder: FlatBuilder,
    open: Option<&'s TableDef>,
}

impl<'s> DynBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_builder(schema, FlatBuilder::new())
    }

    /// Reuse an existing builder (and its allocation)
    pub fn with_builder(schema: &'s Schema, builder: FlatBuilder) -> Self {
        Self {
            schema,
            builder,
            open: None,
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// The underlying builder, for strings, vectors and structs
    pub fn builder(&mut self) -> &mut FlatBuilder {
        &mut self.builder
    }

    pub fn into_builder(self) -> FlatBuilder {
        self.builder
    }

    /// Begin a table of the named type.
    pub fn start_table(&mut self, name: &str) -> Result<(), SchemaError> {
        let def = self
            .schema
            .table(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))?;
        self.builder.start_object(def.slot_count())?;
        self.open = Some(def);
        Ok(())
    }

    /// Set a scalar or enum field; values equal to the schema default are elided.
    pub fn set_scalar(&mut self, name: &str, value: impl Into<Literal>) -> Result<(), SchemaError> {
        let field = self.open_field(name)?;
        let scalar = match &field.ty {
            FieldType::Scalar(scalar) => *scalar,
            FieldType::Enum(name) => {
                self.schema
                    .enumeration(name)
                    .ok_or_else(|| SchemaError::UnknownType {
                        owner: self.open.map_or_else(String::new, |t| t.name.clone()),
                        field: field.name.clone(),
                        name: name.clone(),
                    })?
                    .underlying
            }
            _ => return Err(mismatch(field, "a scalar")),
        };
        let value = value.into();

        macro_rules! push_int {
            ($ty:ty) => {{
                let value = <$ty>::try_from(int_literal(field, value)?).map_err(|_| {
                    SchemaError::OutOfRange {
                        field: field.name.clone(),
                        ty: scalar.name(),
                    }
                })?;
                let default = match field.default {
                    Some(Literal::Int(default)) => <$ty>::try_from(default).unwrap_or(0),
                    _ => 0,
                };
                self.builder.push_slot(field.slot, value, default)?;
            }};
        }

        match scalar {
            ScalarType::Bool => {
                let Literal::Bool(value) = value else {
                    return Err(mismatch(field, "a bool"));
                };
                let default = matches!(field.default, Some(Literal::Bool(true)));
                self.builder.push_slot(field.slot, value, default)?;
            }
            ScalarType::I8 => push_int!(i8),
            ScalarType::U8 => push_int!(u8),
            ScalarType::I16 => push_int!(i16),
            ScalarType::U16 => push_int!(u16),
            ScalarType::I32 => push_int!(i32),
            ScalarType::U32 => push_int!(u32),
            ScalarType::I64 => push_int!(i64),
            ScalarType::U64 => push_int!(u64),
            ScalarType::F32 => {
                let value = float_literal(field, value)? as f32;
                let default = float_default(field) as f32;
                self.builder.push_slot(field.slot, value, default)?;
            }
            ScalarType::F64 => {
                let value = float_literal(field, value)?;
                self.builder.push_slot(field.slot, value, float_default(field))?;
            }
        }
        Ok(())
    }

    /// Set a string, table or vector field to an already-built object.
    pub fn set_offset<K>(&mut self, name: &str, target: Offset<K>) -> Result<(), SchemaError> {
        let field = self.open_field(name)?;
        match field.ty {
            FieldType::String | FieldType::Table(_) | FieldType::Vector(_) => {
                self.builder.push_slot_offset(field.slot, target)?;
                Ok(())
            }
            _ => Err(mismatch(field, "a string, table or vector")),
        }
    }

    /// Set an inline struct field.
    pub fn set_struct<S: FlatStruct>(&mut self, name: &str, value: &S) -> Result<(), SchemaError> {
        let field = self.open_field(name)?;
        let size = match &field.ty {
            FieldType::Struct(name) => self.schema.structure(name).map(|s| s.size),
            _ => None,
        };
        if size != Some(S::SIZE) {
            return Err(mismatch(field, "a struct of matching size"));
        }
        self.builder.push_slot_struct(field.slot, value)?;
        Ok(())
    }

    /// Set a union field to `value`, tagged as `variant`.
    pub fn set_union<K>(&mut self, name: &str, variant: &str, value: Offset<K>) -> Result<(), SchemaError> {
        let field = self.open_field(name)?;
        let FieldType::Union(union) = &field.ty else {
            return Err(mismatch(field, "a union"));
        };
        let tag = self
            .schema
            .union(union)
            .and_then(|u| u.variant_named(variant))
            .map(|v| v.tag)
            .ok_or_else(|| SchemaError::UnknownField {
                owner: union.clone(),
                field: variant.to_string(),
            })?;
        let tag_slot = field
            .union_tag_slot()
            .ok_or_else(|| mismatch(field, "a union with a tag slot"))?;
        self.builder.push_slot_union(tag_slot, field.slot, tag, value)?;
        Ok(())
    }

    /// Close the open table, checking its required fields.
    pub fn end_table(&mut self) -> Result<Offset<TableOffset>, SchemaError> {
        let def = self.open.take().ok_or(SchemaError::NoOpenTable)?;
        Ok(self.builder.end_object_required(&def.required_slots())?)
    }

    /// Finish the buffer, writing the schema's file identifier when it declares one.
    pub fn finish(&mut self, root: Offset<TableOffset>) -> Result<&[u8], SchemaError> {
        let bytes = match self.schema.identifier() {
            Some(identifier) => self.builder.finish_with_identifier(root, &identifier)?,
            None => self.builder.finish(root)?,
        };
        Ok(bytes)
    }

    fn open_field(&self, name: &str) -> Result<&'s FieldDef, SchemaError> {
        let table = self.open.ok_or(SchemaError::NoOpenTable)?;
        let field = table.field(name).ok_or_else(|| SchemaError::UnknownField {
            owner: table.name.clone(),
            field: name.to_string(),
        })?;
        if field.deprecated {
            return Err(SchemaError::DeprecatedField {
                table: table.name.clone(),
                field: field.name.clone(),
            });
        }
        Ok(field)
    }
}

fn mismatch(field: &FieldDef, expected: &'static str) -> SchemaError {
    SchemaError::TypeMismatch {
        field: field.name.clone(),
        expected,
        actual: field.ty.kind_name(),
    }
}

fn int_literal(field: &FieldDef, value: Literal) -> Result<i64, SchemaError> {
    match value {
        Literal::Int(value) => Ok(value),
        _ => Err(mismatch(field, "an integer")),
    }
}

fn float_literal(field: &FieldDef, value: Literal) -> Result<f64, SchemaError> {
    match value {
        Literal::Float(value) => Ok(value),
        Literal::Int(value) => Ok(value as f64),
        Literal::Bool(_) => Err(mismatch(field, "a number")),
    }
}

fn float_default(field: &FieldDef) -> f64 {
    match field.default {
        Some(Literal::Float(value)) => value,
        Some(Literal::Int(value)) => value as f64,
        _ => 0.0,
    }
}
