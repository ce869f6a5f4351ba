//! Whole-buffer verification against a schema
//!
//! The checked reader already refuses out-of-bounds reads one access at a
//! time. The verifier walks everything reachable from the root up front so
//! untrusted input can be rejected before it is handed to application code,
//! and so the `unchecked` accessors become sound for that buffer.

use crate::config::VerifierOptions;
use crate::error::{ReadError, ReadResult};
use crate::layout::{SIZE_SIZE_PREFIX, SIZE_UOFFSET, SIZE_VOFFSET};
use crate::reader::{self, Table, VTable, read_scalar, slice_at};
use crate::schema::{FieldDef, FieldType, Schema, TableDef};

/// Verifies buffers of one [`Schema`].
#[derive(Debug, Clone)]
pub struct Verifier<'s> {
    schema: &'s Schema,
    options: VerifierOptions,
}

/// Mutable walk state for one verification run
struct Walk<'b> {
    buf: &'b [u8],
    depth: usize,
    tables: usize,
}

impl<'s> Verifier<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_options(schema, VerifierOptions::default())
    }

    pub fn with_options(schema: &'s Schema, options: VerifierOptions) -> Self {
        Self { schema, options }
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Verify a buffer whose root offset sits at position 0.
    pub fn verify(&self, buf: &[u8]) -> ReadResult<()> {
        self.verify_at(buf, 0, false).inspect_err(|e| {
            tracing::debug!(error = %e, len = buf.len(), "buffer failed verification");
        })
    }

    /// Verify a size-prefixed buffer.
    pub fn verify_size_prefixed(&self, buf: &[u8]) -> ReadResult<()> {
        let result = reader::size_prefixed_region(buf)
            .and_then(|region| self.verify_at(region, SIZE_SIZE_PREFIX, true));
        result.inspect_err(|e| {
            tracing::debug!(error = %e, len = buf.len(), "size-prefixed buffer failed verification");
        })
    }

    fn verify_at(&self, buf: &[u8], root_pos: usize, size_prefixed: bool) -> ReadResult<()> {
        if buf.len() > self.options.max_apparent_size {
            return Err(ReadError::BufferTooLarge {
                size: buf.len(),
                limit: self.options.max_apparent_size,
            });
        }
        if buf.len() < root_pos + SIZE_UOFFSET {
            return Err(ReadError::Truncated {
                needed: root_pos + SIZE_UOFFSET,
                actual: buf.len(),
            });
        }
        if let Some(identifier) = self.schema.identifier() {
            reader::check_identifier(buf, &identifier, size_prefixed)?;
        }
        let root = self.schema.root().ok_or_else(|| ReadError::UnknownField {
            owner: "schema".to_string(),
            field: "root_table".to_string(),
        })?;

        let mut walk = Walk {
            buf,
            depth: 0,
            tables: 0,
        };
        let target = self.offset(&walk, root_pos)?;
        self.table(&mut walk, target, root)
    }

    // ========================================================================
    // Walk
    // ========================================================================

    fn check_align(&self, pos: usize, align: usize) -> ReadResult<()> {
        if self.options.check_alignment && align > 1 && pos % align != 0 {
            return Err(ReadError::Unaligned { pos, size: align });
        }
        Ok(())
    }

    /// Follow the uoffset at `pos`.
    fn offset(&self, walk: &Walk<'_>, pos: usize) -> ReadResult<usize> {
        self.check_align(pos, SIZE_UOFFSET)?;
        reader::follow_uoffset(walk.buf, pos)
    }

    fn enter(&self, walk: &mut Walk<'_>) -> ReadResult<()> {
        walk.depth += 1;
        if walk.depth > self.options.max_depth {
            return Err(ReadError::DepthLimitExceeded(self.options.max_depth));
        }
        Ok(())
    }

    fn table(&self, walk: &mut Walk<'_>, pos: usize, def: &TableDef) -> ReadResult<()> {
        self.enter(walk)?;
        walk.tables += 1;
        if walk.tables > self.options.max_tables {
            return Err(ReadError::TooManyTables(self.options.max_tables));
        }

        self.check_align(pos, SIZE_UOFFSET)?;
        let table = Table::new(walk.buf, pos)?;
        let vtable = table.vtable()?;
        self.vtable(walk.buf, pos, &vtable)?;

        for field in &def.fields {
            self.field(walk, &table, &vtable, def, field)?;
        }

        walk.depth -= 1;
        Ok(())
    }

    fn vtable(&self, buf: &[u8], table_pos: usize, vtable: &VTable<'_>) -> ReadResult<()> {
        self.check_align(vtable.pos(), SIZE_VOFFSET)?;
        let table_size = vtable.table_size() as usize;
        if table_size < SIZE_UOFFSET {
            return Err(ReadError::BadVTable {
                pos: vtable.pos(),
                reason: "table size smaller than its soffset",
            });
        }
        slice_at(buf, table_pos, table_size)?;
        for slot in 0..vtable.num_fields() as u16 {
            let offset = vtable.field_offset(slot) as usize;
            if offset != 0 && (offset < SIZE_UOFFSET || offset >= table_size) {
                return Err(ReadError::FieldOutsideTable { table_pos, slot });
            }
        }
        Ok(())
    }

    fn field(
        &self,
        walk: &mut Walk<'_>,
        table: &Table<'_>,
        vtable: &VTable<'_>,
        def: &TableDef,
        field: &FieldDef,
    ) -> ReadResult<()> {
        let missing = || ReadError::MissingRequiredField {
            table: def.name.clone(),
            field: field.name.clone(),
        };
        let size = self.schema.inline_size(&field.ty).unwrap_or(0);
        let align = self.schema.inline_align(&field.ty).unwrap_or(1);

        let offset = vtable.field_offset(field.slot) as usize;
        if offset == 0 {
            return if field.required { Err(missing()) } else { Ok(()) };
        }
        if offset + size > vtable.table_size() as usize {
            return Err(ReadError::FieldOutsideTable {
                table_pos: table.pos(),
                slot: field.slot,
            });
        }
        let pos = table.pos() + offset;
        self.check_align(pos, align)?;

        match &field.ty {
            FieldType::Scalar(_) | FieldType::Enum(_) | FieldType::Struct(_) => Ok(()),
            FieldType::Union(name) => {
                let tag_slot = field.union_tag_slot().ok_or_else(missing)?;
                let tag = table.get::<u8>(tag_slot, 0)?;
                if tag == 0 {
                    return Ok(());
                }
                let union = self.schema.union(name).ok_or_else(|| ReadError::UnknownField {
                    owner: "schema".to_string(),
                    field: name.clone(),
                })?;
                let variant = union.variant(tag).ok_or_else(|| ReadError::UnknownUnionTag {
                    union: name.clone(),
                    tag,
                })?;
                let target = self.offset(walk, pos)?;
                if let Some(table_def) = self.schema.table(&variant.name) {
                    self.table(walk, target, table_def)
                } else {
                    let ty = FieldType::Struct(variant.name.clone());
                    self.inline(walk, target, &ty)
                }
            }
            ty => {
                let target = self.offset(walk, pos)?;
                self.referenced(walk, target, ty)
            }
        }
    }

    /// Scalar, enum or struct stored at `pos` outside a table (vector element, union struct).
    fn inline(&self, walk: &Walk<'_>, pos: usize, ty: &FieldType) -> ReadResult<()> {
        let size = self.schema.inline_size(ty).unwrap_or(0);
        let align = self.schema.inline_align(ty).unwrap_or(1);
        self.check_align(pos, align)?;
        slice_at(walk.buf, pos, size)?;
        Ok(())
    }

    /// String, table or vector whose data starts at `pos`.
    fn referenced(&self, walk: &mut Walk<'_>, pos: usize, ty: &FieldType) -> ReadResult<()> {
        match ty {
            FieldType::String => self.string(walk.buf, pos),
            FieldType::Table(name) => {
                let def = self.schema.table(name).ok_or_else(|| ReadError::UnknownField {
                    owner: "schema".to_string(),
                    field: name.clone(),
                })?;
                self.table(walk, pos, def)
            }
            FieldType::Vector(elem) => self.vector(walk, pos, elem),
            other => Err(ReadError::TypeMismatch {
                field: other.to_string(),
                expected: "a string, table or vector",
                actual: other.kind_name(),
            }),
        }
    }

    fn string(&self, buf: &[u8], pos: usize) -> ReadResult<()> {
        self.check_align(pos, SIZE_UOFFSET)?;
        let bytes = reader::read_byte_string(buf, pos)?;
        let terminator = pos + SIZE_UOFFSET + bytes.len();
        if buf.get(terminator) != Some(&0) {
            return Err(ReadError::MissingNulTerminator { pos });
        }
        std::str::from_utf8(bytes).map_err(|_| ReadError::InvalidUtf8 { pos })?;
        Ok(())
    }

    fn vector(&self, walk: &mut Walk<'_>, pos: usize, elem: &FieldType) -> ReadResult<()> {
        self.check_align(pos, SIZE_UOFFSET)?;
        let len = read_scalar::<u32>(walk.buf, pos)? as usize;
        let elem_size = self.schema.inline_size(elem).unwrap_or(0);
        let body = len.checked_mul(elem_size).ok_or(ReadError::OutOfBounds {
            pos,
            len: usize::MAX,
            buffer_len: walk.buf.len(),
        })?;
        let start = pos + SIZE_UOFFSET;
        slice_at(walk.buf, start, body)?;

        if !elem.is_offset() {
            if len > 0 {
                self.check_align(start, self.schema.inline_align(elem).unwrap_or(1))?;
            }
            return Ok(());
        }

        self.enter(walk)?;
        for index in 0..len {
            let target = self.offset(walk, start + index * elem_size)?;
            self.referenced(walk, target, elem)?;
        }
        walk.depth -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::field_index_to_offset;
    use crate::{DynBuilder, FlatBuilder};

    const SCHEMA: &str = r#"
        file_identifier = "TEST"
        root_table = "Root"

        [[structs]]
        name = "Pair"
        size = 8
        align = 4
        fields = [
            { name = "a", type = "i32", offset = 0 },
            { name = "b", type = "i32", offset = 4 },
        ]

        [[tables]]
        name = "Root"
        fields = [
            { name = "name", slot = 0, type = "string", required = true },
            { name = "children", slot = 1, type = "[Node]" },
            { name = "pair", slot = 2, type = "Pair" },
            { name = "tags", slot = 3, type = "[string]" },
        ]

        [[tables]]
        name = "Node"
        fields = [
            { name = "value", slot = 0, type = "i64" },
            { name = "child", slot = 1, type = "Node" },
        ]
    "#;

    fn schema() -> Schema {
        Schema::from_toml_str(SCHEMA).unwrap()
    }

    fn build(schema: &Schema, name: Option<&str>, depth: usize) -> Vec<u8> {
        let mut b = DynBuilder::new(schema);
        let mut child = None;
        for level in 0..depth {
            b.start_table("Node").unwrap();
            b.set_scalar("value", level as i64 + 1).unwrap();
            if let Some(child) = child {
                b.set_offset("child", child).unwrap();
            }
            child = Some(b.end_table().unwrap());
        }
        let children = child.map(|c| b.builder().create_vector_of_offsets(&[c]).unwrap());
        let tags = b.builder().create_vector_of_strings(&["x", "yz"]).unwrap();
        let name = name.map(|n| b.builder().create_string(n).unwrap());

        b.start_table("Root").unwrap();
        if let Some(name) = name {
            b.set_offset("name", name).unwrap();
        }
        if let Some(children) = children {
            b.set_offset("children", children).unwrap();
        }
        b.set_offset("tags", tags).unwrap();
        // Bypass the required check so malformed buffers can be produced
        let root = b.builder().end_object().unwrap();
        b.finish(root).unwrap().to_vec()
    }

    #[test]
    fn test_valid_buffer_passes() {
        let schema = schema();
        let bytes = build(&schema, Some("root"), 3);
        Verifier::new(&schema).verify(&bytes).unwrap();
    }

    #[test]
    fn test_missing_required_field() {
        let schema = schema();
        let bytes = build(&schema, None, 1);
        assert_eq!(
            Verifier::new(&schema).verify(&bytes),
            Err(ReadError::MissingRequiredField {
                table: "Root".to_string(),
                field: "name".to_string()
            })
        );
    }

    #[test]
    fn test_depth_limit() {
        let schema = schema();
        let bytes = build(&schema, Some("deep"), 10);
        let options = VerifierOptions {
            max_depth: 4,
            ..VerifierOptions::default()
        };
        assert_eq!(
            Verifier::with_options(&schema, options).verify(&bytes),
            Err(ReadError::DepthLimitExceeded(4))
        );
    }

    #[test]
    fn test_table_and_size_limits() {
        let schema = schema();
        let bytes = build(&schema, Some("many"), 5);
        let options = VerifierOptions {
            max_tables: 3,
            ..VerifierOptions::default()
        };
        assert_eq!(
            Verifier::with_options(&schema, options).verify(&bytes),
            Err(ReadError::TooManyTables(3))
        );

        let options = VerifierOptions {
            max_apparent_size: 16,
            ..VerifierOptions::default()
        };
        assert!(matches!(
            Verifier::with_options(&schema, options).verify(&bytes),
            Err(ReadError::BufferTooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn test_identifier_mismatch() {
        let schema = schema();
        let mut bytes = build(&schema, Some("id"), 0);
        bytes[4..8].copy_from_slice(b"NOPE");
        assert!(matches!(
            Verifier::new(&schema).verify(&bytes),
            Err(ReadError::IdentifierMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_nul_terminator() {
        let schema = schema();
        let mut bytes = build(&schema, Some("abc"), 0);
        let root = reader::root(&bytes).unwrap();
        let target = root.field_target(0).unwrap().unwrap();
        bytes[target + SIZE_UOFFSET + 3] = b'!';
        assert_eq!(
            Verifier::new(&schema).verify(&bytes),
            Err(ReadError::MissingNulTerminator { pos: target })
        );
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let schema = schema();
        let mut bytes = build(&schema, Some("abc"), 0);
        let root = reader::root(&bytes).unwrap();
        let target = root.field_target(0).unwrap().unwrap();
        bytes[target + SIZE_UOFFSET] = 0xFF;
        assert_eq!(
            Verifier::new(&schema).verify(&bytes),
            Err(ReadError::InvalidUtf8 { pos: target })
        );
    }

    #[test]
    fn test_field_outside_table_rejected() {
        let schema = schema();
        let mut bytes = build(&schema, Some("abc"), 0);
        let root = reader::root(&bytes).unwrap();
        let vtable = root.vtable().unwrap();
        let entry = vtable.pos() + field_index_to_offset(0) as usize;
        let bogus = vtable.table_size();
        bytes[entry..entry + 2].copy_from_slice(&bogus.to_le_bytes());
        assert!(matches!(
            Verifier::new(&schema).verify(&bytes),
            Err(ReadError::FieldOutsideTable { slot: 0, .. })
        ));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let schema = schema();
        let bytes = build(&schema, Some("abc"), 2);
        for cut in [0, 3, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                Verifier::new(&schema).verify(&bytes[..cut]).is_err(),
                "cut at {cut} should fail"
            );
        }
    }

    #[test]
    fn test_size_prefixed_buffer() {
        let schema = schema();
        let mut builder = FlatBuilder::new();
        let name = builder.create_string("sized").unwrap();
        builder.start_object(4).unwrap();
        builder.push_slot_offset(0, name).unwrap();
        let root = builder.end_object().unwrap();
        let bytes = builder
            .finish_size_prefixed(root, Some(b"TEST"))
            .unwrap()
            .to_vec();

        let verifier = Verifier::new(&schema);
        verifier.verify_size_prefixed(&bytes).unwrap();
        assert!(verifier.verify(&bytes).is_err());
    }
}
