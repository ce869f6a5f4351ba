//! Table and vtable views

use super::{Vector, VectorElement, follow_uoffset, read_byte_string, read_scalar, read_str, slice_at};
use crate::error::{ReadError, ReadResult};
use crate::layout::{SIZE_SOFFSET, SIZE_VOFFSET, Scalar, field_index_to_offset};
use crate::structs::FlatStruct;

/// A table positioned inside a finished buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table<'a> {
    pub(crate) buf: &'a [u8],
    pub(crate) pos: usize,
}

/// The field layout shared by every table with the same field-presence pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VTable<'a> {
    buf: &'a [u8],
    pos: usize,
    size: u16,
    table_size: u16,
}

impl<'a> VTable<'a> {
    /// Parse the vtable header at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> ReadResult<Self> {
        let size = read_scalar::<u16>(buf, pos)?;
        let table_size = read_scalar::<u16>(buf, pos + SIZE_VOFFSET)?;
        if (size as usize) < field_index_to_offset(0) as usize {
            return Err(ReadError::BadVTable {
                pos,
                reason: "size smaller than header",
            });
        }
        if size % 2 != 0 {
            return Err(ReadError::BadVTable {
                pos,
                reason: "odd size",
            });
        }
        slice_at(buf, pos, size as usize).map_err(|_| ReadError::BadVTable {
            pos,
            reason: "extends past end of buffer",
        })?;
        Ok(Self {
            buf,
            pos,
            size,
            table_size,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Byte size of the vtable itself
    pub fn size(&self) -> u16 {
        self.size
    }

    /// Byte size of the inline region of tables using this vtable
    pub fn table_size(&self) -> u16 {
        self.table_size
    }

    /// Number of slots described (trailing absent slots are not stored)
    pub fn num_fields(&self) -> usize {
        (self.size as usize - field_index_to_offset(0) as usize) / SIZE_VOFFSET
    }

    /// Inline offset of `slot` within its table, 0 when absent.
    pub fn field_offset(&self, slot: u16) -> u16 {
        let entry = field_index_to_offset(slot) as usize;
        if entry >= self.size as usize {
            return 0;
        }
        let pos = self.pos + entry;
        u16::read_le(&self.buf[pos..pos + SIZE_VOFFSET])
    }

    /// Raw vtable bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.buf[self.pos..self.pos + self.size as usize]
    }
}

impl<'a> Table<'a> {
    /// A table at `pos`; only the soffset is checked here, the vtable lazily.
    pub fn new(buf: &'a [u8], pos: usize) -> ReadResult<Self> {
        slice_at(buf, pos, SIZE_SOFFSET)?;
        Ok(Self { buf, pos })
    }

    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Resolve this table's vtable (stored at `pos - soffset`).
    pub fn vtable(&self) -> ReadResult<VTable<'a>> {
        let soffset = read_scalar::<i32>(self.buf, self.pos)?;
        let vtable_pos = self.pos as i64 - soffset as i64;
        if vtable_pos < 0 || vtable_pos as usize >= self.buf.len() {
            return Err(ReadError::BadVTable {
                pos: self.pos,
                reason: "vtable offset points outside the buffer",
            });
        }
        VTable::at(self.buf, vtable_pos as usize)
    }

    /// Absolute position of `slot`'s inline data, or `None` when absent.
    pub fn field_pos(&self, slot: u16) -> ReadResult<Option<usize>> {
        let vtable = self.vtable()?;
        match vtable.field_offset(slot) {
            0 => Ok(None),
            offset if offset >= vtable.table_size() => Err(ReadError::FieldOutsideTable {
                table_pos: self.pos,
                slot,
            }),
            offset => Ok(Some(self.pos + offset as usize)),
        }
    }

    /// Whether `slot` was written.
    pub fn has_field(&self, slot: u16) -> ReadResult<bool> {
        Ok(self.field_pos(slot)?.is_some())
    }

    /// Scalar in `slot`, or `default` when absent.
    pub fn get<T: Scalar>(&self, slot: u16, default: T) -> ReadResult<T> {
        Ok(self.get_opt(slot)?.unwrap_or(default))
    }

    /// Scalar in `slot`, or `None` when absent.
    pub fn get_opt<T: Scalar>(&self, slot: u16) -> ReadResult<Option<T>> {
        match self.field_pos(slot)? {
            Some(pos) => Ok(Some(read_scalar(self.buf, pos)?)),
            None => Ok(None),
        }
    }

    /// Inline struct in `slot`.
    pub fn get_struct<S: FlatStruct>(&self, slot: u16) -> ReadResult<Option<S>> {
        match self.field_pos(slot)? {
            Some(pos) => Ok(Some(S::read_from(slice_at(self.buf, pos, S::SIZE)?))),
            None => Ok(None),
        }
    }

    /// String referenced from `slot`.
    pub fn get_str(&self, slot: u16) -> ReadResult<Option<&'a str>> {
        match self.field_target(slot)? {
            Some(target) => Ok(Some(read_str(self.buf, target)?)),
            None => Ok(None),
        }
    }

    /// Byte string referenced from `slot`.
    pub fn get_bytes(&self, slot: u16) -> ReadResult<Option<&'a [u8]>> {
        match self.field_target(slot)? {
            Some(target) => Ok(Some(read_byte_string(self.buf, target)?)),
            None => Ok(None),
        }
    }

    /// Sub-table referenced from `slot`.
    pub fn get_table(&self, slot: u16) -> ReadResult<Option<Table<'a>>> {
        match self.field_target(slot)? {
            Some(target) => Ok(Some(Table::new(self.buf, target)?)),
            None => Ok(None),
        }
    }

    /// Vector referenced from `slot`.
    pub fn get_vector<T: VectorElement<'a>>(&self, slot: u16) -> ReadResult<Option<Vector<'a, T>>> {
        match self.field_target(slot)? {
            Some(target) => Ok(Some(Vector::at(self.buf, target)?)),
            None => Ok(None),
        }
    }

    /// Union stored as a tag in `type_slot` and a reference in `value_slot`.
    ///
    /// Returns the tag and the absolute position of the value, or `None` for
    /// the NONE tag (0) or a missing value.
    pub fn get_union(&self, type_slot: u16, value_slot: u16) -> ReadResult<Option<(u8, usize)>> {
        let tag = self.get::<u8>(type_slot, 0)?;
        if tag == 0 {
            return Ok(None);
        }
        Ok(self.field_target(value_slot)?.map(|target| (tag, target)))
    }

    /// Union value read as a table.
    pub fn get_union_table(&self, type_slot: u16, value_slot: u16) -> ReadResult<Option<(u8, Table<'a>)>> {
        match self.get_union(type_slot, value_slot)? {
            Some((tag, target)) => Ok(Some((tag, Table::new(self.buf, target)?))),
            None => Ok(None),
        }
    }

    /// Union value read as a standalone struct.
    pub fn get_union_struct<S: FlatStruct>(&self, type_slot: u16, value_slot: u16) -> ReadResult<Option<(u8, S)>> {
        match self.get_union(type_slot, value_slot)? {
            Some((tag, target)) => Ok(Some((tag, S::read_from(slice_at(self.buf, target, S::SIZE)?)))),
            None => Ok(None),
        }
    }

    /// Absolute position of the object referenced by the uoffset in `slot`.
    pub fn field_target(&self, slot: u16) -> ReadResult<Option<usize>> {
        match self.field_pos(slot)? {
            Some(pos) => Ok(Some(follow_uoffset(self.buf, pos)?)),
            None => Ok(None),
        }
    }
}
