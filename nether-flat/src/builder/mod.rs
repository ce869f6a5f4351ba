//! Buffer builder
//!
//! Objects are written back-to-front: the buffer grows towards lower
//! addresses, so every child (string, vector, table) must be finished before
//! the parent that references it is started. Offsets returned by the builder
//! are distances from the end of the buffer and stay valid as it grows.
//!
//! ```text
//! start_object(n) ─┐
//!   push_slot*     │  field values staged per slot
//! end_object() ────┘  fields laid out inline, soffset + (shared) vtable
//!                     emitted, Offset returned
//! finish(root)        root uoffset (+ identifier, + size prefix) prepended
//! ```
//!
//! Only one object or vector may be open at a time.

mod cache;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicU32, Ordering};

use smallvec::SmallVec;

use crate::config::BuilderOptions;
use crate::error::BuildError;
use crate::layout::{
    BuilderId, FILE_IDENTIFIER_LENGTH, MAX_BUFFER_SIZE, Offset, SIZE_SIZE_PREFIX, SIZE_SOFFSET,
    SIZE_UOFFSET,
    Scalar, StrOffset, StructOffset, TableOffset, VectorOffset, field_index_to_offset,
    padding_bytes,
};
use crate::structs::FlatStruct;
use cache::DedupCache;

static NEXT_BUILDER_ID: AtomicU32 = AtomicU32::new(1);

/// Where a field of the open object was written
#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    slot: u16,
    offset: u32,
}

/// A field of the open object, held until `end_object` lays the table out
#[derive(Debug)]
struct PendingField {
    slot: u16,
    align: usize,
    value: PendingValue,
}

#[derive(Debug)]
enum PendingValue {
    Inline(SmallVec<[u8; 16]>),
    Offset(u32),
}

#[derive(Debug)]
struct OpenObject {
    field_count: u16,
    fields: SmallVec<[PendingField; 16]>,
}

#[derive(Debug)]
struct OpenVector {
    declared: usize,
    pushed: usize,
}

/// Single-writer builder producing one finished buffer at a time.
#[derive(Debug)]
pub struct FlatBuilder {
    buf: Vec<u8>,
    head: usize,
    min_align: usize,
    id: BuilderId,
    options: BuilderOptions,
    object: Option<OpenObject>,
    vector: Option<OpenVector>,
    vtables: DedupCache,
    strings: DedupCache,
    objects_built: usize,
    finished: bool,
}

impl Default for FlatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatBuilder {
    /// Create a builder with default options
    pub fn new() -> Self {
        Self::with_options(BuilderOptions::default())
    }

    /// Create a builder reserving `capacity` bytes up front
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_options(BuilderOptions {
            initial_capacity: capacity,
            ..BuilderOptions::default()
        })
    }

    /// Create a builder with explicit options
    pub fn with_options(options: BuilderOptions) -> Self {
        let capacity = options.initial_capacity.min(MAX_BUFFER_SIZE);
        Self {
            buf: vec![0u8; capacity],
            head: capacity,
            min_align: 1,
            id: BuilderId {
                id: NEXT_BUILDER_ID.fetch_add(1, Ordering::Relaxed),
                generation: 0,
            },
            options,
            object: None,
            vector: None,
            vtables: DedupCache::default(),
            strings: DedupCache::default(),
            objects_built: 0,
            finished: false,
        }
    }

    /// Options this builder was created with
    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Clear all state so the allocation can be reused for the next buffer.
    ///
    /// Offsets handed out before the reset are rejected afterwards.
    pub fn reset(&mut self) {
        self.buf[self.head..].fill(0);
        self.head = self.buf.len();
        self.min_align = 1;
        self.object = None;
        self.vector = None;
        self.vtables.clear();
        self.strings.clear();
        self.objects_built = 0;
        self.finished = false;
        self.id.generation = self.id.generation.wrapping_add(1);
    }

    /// Number of distinct vtables written so far
    pub fn vtable_count(&self) -> usize {
        self.vtables.len()
    }

    /// Whether `finish` has been called since creation or the last reset
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Begin a table with `field_count` slots, all initially absent.
    pub fn start_object(&mut self, field_count: u16) -> Result<(), BuildError> {
        self.ensure_top_level()?;
        self.object = Some(OpenObject {
            field_count,
            fields: SmallVec::new(),
        });
        Ok(())
    }

    /// Write a scalar field, eliding it when it equals `default`
    /// (unless `force_defaults` is set).
    pub fn push_slot<T: Scalar>(&mut self, slot: u16, value: T, default: T) -> Result<(), BuildError> {
        self.check_slot(slot)?;
        if value == default && !self.options.force_defaults {
            return Ok(());
        }
        self.push_slot_always(slot, value)
    }

    /// Write a scalar field unconditionally.
    pub fn push_slot_always<T: Scalar>(&mut self, slot: u16, value: T) -> Result<(), BuildError> {
        self.check_slot(slot)?;
        let mut bytes: SmallVec<[u8; 16]> = SmallVec::from_elem(0, T::SIZE);
        value.write_le(&mut bytes);
        self.stage_field(slot, T::SIZE, PendingValue::Inline(bytes));
        Ok(())
    }

    /// Write a reference to an already-finished string, vector, table or struct.
    pub fn push_slot_offset<K>(&mut self, slot: u16, target: Offset<K>) -> Result<(), BuildError> {
        self.check_slot(slot)?;
        let target = self.check_owner(target)?;
        self.stage_field(slot, SIZE_UOFFSET, PendingValue::Offset(target));
        Ok(())
    }

    /// Write a struct inline in the open table.
    pub fn push_slot_struct<S: FlatStruct>(&mut self, slot: u16, value: &S) -> Result<(), BuildError> {
        self.check_slot(slot)?;
        let mut bytes: SmallVec<[u8; 16]> = SmallVec::from_elem(0, S::SIZE);
        value.write_to(&mut bytes);
        self.stage_field(slot, S::ALIGN, PendingValue::Inline(bytes));
        Ok(())
    }

    /// Write a union as its tag (`type_slot`) and value reference (`value_slot`).
    pub fn push_slot_union<K>(
        &mut self,
        type_slot: u16,
        value_slot: u16,
        tag: u8,
        value: Offset<K>,
    ) -> Result<(), BuildError> {
        if tag == 0 {
            return Err(BuildError::BuilderMisuse("union tag 0 (NONE) carries no value"));
        }
        self.check_slot(type_slot)?;
        self.push_slot_offset(value_slot, value)?;
        self.push_slot_always(type_slot, tag)
    }

    /// Close the open table, emitting (or reusing) its vtable.
    pub fn end_object(&mut self) -> Result<Offset<TableOffset>, BuildError> {
        self.end_object_required(&[])
    }

    /// Close the open table, failing if any slot in `required` was not written.
    pub fn end_object_required(&mut self, required: &[u16]) -> Result<Offset<TableOffset>, BuildError> {
        if self.finished {
            return Err(BuildError::AlreadyFinished);
        }
        let mut object = self.object.take().ok_or(BuildError::NoOpenObject)?;

        if let Some(&slot) = required
            .iter()
            .find(|&&slot| !object.fields.iter().any(|f| f.slot == slot))
        {
            return Err(BuildError::MissingRequiredField { slot });
        }

        // Widest alignment first from an aligned start: the inline layout then
        // depends only on which slots are present, never on what precedes it.
        object
            .fields
            .sort_by(|a, b| b.align.cmp(&a.align).then(a.slot.cmp(&b.slot)));
        let table_align = object
            .fields
            .iter()
            .map(|f| f.align)
            .max()
            .unwrap_or(1)
            .max(SIZE_SOFFSET);
        self.align(0, table_align)?;
        let start = self.used_space() as u32;

        let mut fields: SmallVec<[FieldLoc; 16]> = SmallVec::new();
        for field in &object.fields {
            let offset = match &field.value {
                PendingValue::Inline(bytes) => self.push_bytes(bytes, field.align)?,
                PendingValue::Offset(target) => self.push_uoffset(*target)?,
            };
            fields.push(FieldLoc {
                slot: field.slot,
                offset,
            });
        }

        // Placeholder for the vtable soffset; patched below
        let object_offset = self.push_scalar(0i32)?;
        let table_size = object_offset - start;

        // Trailing absent slots are dropped, interior ones stay as zero holes
        let slot_count = fields
            .iter()
            .map(|f| f.slot as usize + 1)
            .max()
            .unwrap_or(0);
        let vtable_size = field_index_to_offset(0) as usize + slot_count * 2;
        if table_size > u16::MAX as u32 || vtable_size > u16::MAX as usize {
            return Err(BuildError::BuilderMisuse("table exceeds 64 KiB of inline data"));
        }

        let mut vtable: SmallVec<[u8; 64]> = SmallVec::from_elem(0, vtable_size);
        vtable[0..2].copy_from_slice(&(vtable_size as u16).to_le_bytes());
        vtable[2..4].copy_from_slice(&(table_size as u16).to_le_bytes());
        for field in &fields {
            let pos = field_index_to_offset(field.slot) as usize;
            let voffset = (object_offset - field.offset) as u16;
            vtable[pos..pos + 2].copy_from_slice(&voffset.to_le_bytes());
        }

        let hash = DedupCache::hash(&vtable);
        let existing = if self.options.dedup_vtables {
            self.vtables
                .find(hash, |offset| self.bytes_at(offset, vtable.len()) == Some(&vtable[..]))
        } else {
            None
        };

        let vtable_offset = match existing {
            Some(offset) => {
                tracing::trace!(vtable = offset, table = object_offset, "reusing vtable");
                offset
            }
            None => {
                let head = self.make_space(vtable.len())?;
                self.buf[head..head + vtable.len()].copy_from_slice(&vtable);
                let offset = self.used_space() as u32;
                self.vtables.insert(hash, offset);
                offset
            }
        };

        let table_pos = self.buf.len() - object_offset as usize;
        let soffset = vtable_offset as i32 - object_offset as i32;
        soffset.write_le(&mut self.buf[table_pos..table_pos + 4]);

        self.objects_built += 1;
        Ok(Offset::new(object_offset, self.id))
    }

    // ========================================================================
    // Strings
    // ========================================================================

    /// Write a length-prefixed, NUL-terminated UTF-8 string.
    pub fn create_string(&mut self, value: &str) -> Result<Offset<StrOffset>, BuildError> {
        self.create_byte_string(value.as_bytes())
    }

    /// Write a length-prefixed, NUL-terminated byte string.
    pub fn create_byte_string(&mut self, bytes: &[u8]) -> Result<Offset<StrOffset>, BuildError> {
        self.ensure_top_level()?;
        self.align(bytes.len() + 1, SIZE_UOFFSET)?;
        let head = self.make_space(1)?;
        self.buf[head] = 0;
        let head = self.make_space(bytes.len())?;
        self.buf[head..head + bytes.len()].copy_from_slice(bytes);
        let offset = self.push_scalar(bytes.len() as u32)?;
        Ok(Offset::new(offset, self.id))
    }

    /// Write a string, reusing an identical one created earlier through this method.
    pub fn create_shared_string(&mut self, value: &str) -> Result<Offset<StrOffset>, BuildError> {
        self.ensure_top_level()?;
        let hash = DedupCache::hash(value.as_bytes());
        let existing = self
            .strings
            .find(hash, |offset| self.string_at(offset) == Some(value.as_bytes()));
        if let Some(offset) = existing {
            return Ok(Offset::new(offset, self.id));
        }
        let offset = self.create_string(value)?;
        self.strings.insert(hash, offset.value());
        Ok(offset)
    }

    // ========================================================================
    // Vectors
    // ========================================================================

    /// Begin a vector of `len` elements of `elem_size` bytes each.
    ///
    /// Elements must then be pushed in reverse order (last element first).
    pub fn start_vector(&mut self, elem_size: usize, len: usize, alignment: usize) -> Result<(), BuildError> {
        self.ensure_top_level()?;
        let total = elem_size
            .checked_mul(len)
            .ok_or(BuildError::BufferTooLarge)?;
        self.align(total, SIZE_UOFFSET)?;
        self.align(total, alignment.max(1))?;
        self.vector = Some(OpenVector {
            declared: len,
            pushed: 0,
        });
        Ok(())
    }

    /// Push one scalar element into the open vector.
    pub fn push_element<T: Scalar>(&mut self, value: T) -> Result<(), BuildError> {
        self.open_vector()?;
        self.push_scalar(value)?;
        self.count_element();
        Ok(())
    }

    /// Push one struct element into the open vector.
    pub fn push_element_struct<S: FlatStruct>(&mut self, value: &S) -> Result<(), BuildError> {
        self.open_vector()?;
        self.write_struct(value)?;
        self.count_element();
        Ok(())
    }

    /// Push one reference element into the open vector.
    pub fn push_element_offset<K>(&mut self, target: Offset<K>) -> Result<(), BuildError> {
        self.open_vector()?;
        let target = self.check_owner(target)?;
        self.push_uoffset(target)?;
        self.count_element();
        Ok(())
    }

    /// Close the open vector, writing its length prefix.
    pub fn end_vector<T>(&mut self, len: usize) -> Result<Offset<VectorOffset<T>>, BuildError> {
        let vector = self
            .vector
            .take()
            .ok_or(BuildError::BuilderMisuse("end_vector without start_vector"))?;
        if vector.pushed != len || vector.declared != len {
            return Err(BuildError::VectorLengthMismatch {
                declared: vector.declared,
                pushed: vector.pushed,
            });
        }
        let offset = self.push_scalar(len as u32)?;
        Ok(Offset::new(offset, self.id))
    }

    /// Write a vector of scalars, preserving slice order.
    pub fn create_vector<T: Scalar>(&mut self, items: &[T]) -> Result<Offset<VectorOffset<T>>, BuildError> {
        self.start_vector(T::SIZE, items.len(), T::SIZE)?;
        for &item in items.iter().rev() {
            self.push_element(item)?;
        }
        self.end_vector(items.len())
    }

    /// Write a vector of inline structs, preserving slice order.
    pub fn create_vector_of_structs<S: FlatStruct>(
        &mut self,
        items: &[S],
    ) -> Result<Offset<VectorOffset<S>>, BuildError> {
        self.start_vector(S::SIZE, items.len(), S::ALIGN)?;
        for item in items.iter().rev() {
            self.push_element_struct(item)?;
        }
        self.end_vector(items.len())
    }

    /// Write a vector of references, preserving slice order.
    pub fn create_vector_of_offsets<K>(
        &mut self,
        items: &[Offset<K>],
    ) -> Result<Offset<VectorOffset<Offset<K>>>, BuildError> {
        for &item in items {
            self.check_owner(item)?;
        }
        self.start_vector(SIZE_UOFFSET, items.len(), SIZE_UOFFSET)?;
        for &item in items.iter().rev() {
            self.push_element_offset(item)?;
        }
        self.end_vector(items.len())
    }

    /// Write every string, then a vector referencing them in slice order.
    pub fn create_vector_of_strings<S: AsRef<str>>(
        &mut self,
        items: &[S],
    ) -> Result<Offset<VectorOffset<Offset<StrOffset>>>, BuildError> {
        let offsets = items
            .iter()
            .map(|item| self.create_string(item.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.create_vector_of_offsets(&offsets)
    }

    // ========================================================================
    // Standalone structs
    // ========================================================================

    /// Write a struct on its own (no vtable), e.g. as a union value.
    pub fn create_struct<S: FlatStruct>(&mut self, value: &S) -> Result<Offset<StructOffset>, BuildError> {
        self.ensure_top_level()?;
        let offset = self.write_struct(value)?;
        Ok(Offset::new(offset, self.id))
    }

    // ========================================================================
    // Finishing
    // ========================================================================

    /// Write the root offset and freeze the buffer.
    pub fn finish(&mut self, root: Offset<TableOffset>) -> Result<&[u8], BuildError> {
        self.finish_internal(root, None, false)
    }

    /// Like [`finish`](Self::finish), with a 4-byte file identifier after the root offset.
    pub fn finish_with_identifier(
        &mut self,
        root: Offset<TableOffset>,
        identifier: &[u8; FILE_IDENTIFIER_LENGTH],
    ) -> Result<&[u8], BuildError> {
        self.finish_internal(root, Some(identifier), false)
    }

    /// Like [`finish`](Self::finish), prefixed with the byte length of the rest of the buffer.
    pub fn finish_size_prefixed(
        &mut self,
        root: Offset<TableOffset>,
        identifier: Option<&[u8; FILE_IDENTIFIER_LENGTH]>,
    ) -> Result<&[u8], BuildError> {
        self.finish_internal(root, identifier, true)
    }

    /// The finished bytes.
    pub fn finished_data(&self) -> Result<&[u8], BuildError> {
        if !self.finished {
            return Err(BuildError::BuilderMisuse("buffer is not finished"));
        }
        Ok(&self.buf[self.head..])
    }

    /// Hand off the finished bytes, consuming the builder.
    pub fn into_finished(mut self) -> Result<FinishedBuffer, BuildError> {
        if !self.finished {
            return Err(BuildError::BuilderMisuse("buffer is not finished"));
        }
        self.buf.drain(..self.head);
        Ok(FinishedBuffer { data: self.buf })
    }

    fn finish_internal(
        &mut self,
        root: Offset<TableOffset>,
        identifier: Option<&[u8; FILE_IDENTIFIER_LENGTH]>,
        size_prefixed: bool,
    ) -> Result<&[u8], BuildError> {
        self.ensure_top_level()?;
        if self.objects_built == 0 {
            return Err(BuildError::NothingToFinish);
        }
        let root = self.check_owner(root)?;

        let header = SIZE_UOFFSET
            + if identifier.is_some() { FILE_IDENTIFIER_LENGTH } else { 0 }
            + if size_prefixed { SIZE_SIZE_PREFIX } else { 0 };
        let alignment = self.min_align.max(SIZE_UOFFSET);
        self.align(header, alignment)?;

        if let Some(identifier) = identifier {
            let head = self.make_space(FILE_IDENTIFIER_LENGTH)?;
            self.buf[head..head + FILE_IDENTIFIER_LENGTH].copy_from_slice(identifier);
        }
        self.push_uoffset(root)?;
        if size_prefixed {
            let size = self.used_space() as u32;
            self.push_scalar(size)?;
        }

        self.finished = true;
        tracing::debug!(
            size = self.used_space(),
            tables = self.objects_built,
            vtables = self.vtables.len(),
            "finished flat buffer"
        );
        Ok(&self.buf[self.head..])
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn used_space(&self) -> usize {
        self.buf.len() - self.head
    }

    fn ensure_top_level(&self) -> Result<(), BuildError> {
        if self.finished {
            return Err(BuildError::AlreadyFinished);
        }
        if self.object.is_some() {
            return Err(BuildError::UnclosedObject);
        }
        if self.vector.is_some() {
            return Err(BuildError::BuilderMisuse("a vector is still open"));
        }
        Ok(())
    }

    fn check_slot(&self, slot: u16) -> Result<(), BuildError> {
        if self.finished {
            return Err(BuildError::AlreadyFinished);
        }
        let object = self.object.as_ref().ok_or(BuildError::InvalidSlot {
            slot,
            field_count: 0,
        })?;
        if slot >= object.field_count {
            return Err(BuildError::InvalidSlot {
                slot,
                field_count: object.field_count,
            });
        }
        if object.fields.iter().any(|f| f.slot == slot) {
            return Err(BuildError::BuilderMisuse("slot written twice"));
        }
        Ok(())
    }

    fn open_vector(&self) -> Result<(), BuildError> {
        match &self.vector {
            Some(vector) if vector.pushed < vector.declared => Ok(()),
            Some(vector) => Err(BuildError::VectorLengthMismatch {
                declared: vector.declared,
                pushed: vector.pushed + 1,
            }),
            None => Err(BuildError::BuilderMisuse("no vector is open")),
        }
    }

    fn count_element(&mut self) {
        if let Some(vector) = self.vector.as_mut() {
            vector.pushed += 1;
        }
    }

    /// Validate that `target` was produced by this builder and is already written.
    fn check_owner<K>(&self, target: Offset<K>) -> Result<u32, BuildError> {
        if target.owner() != self.id {
            return Err(BuildError::ForeignOffset(target.value()));
        }
        if target.value() == 0 || target.value() as usize > self.used_space() {
            return Err(BuildError::BuilderMisuse("offset refers to data that was never written"));
        }
        Ok(target.value())
    }

    fn stage_field(&mut self, slot: u16, align: usize, value: PendingValue) {
        if let Some(object) = self.object.as_mut() {
            object.fields.push(PendingField { slot, align, value });
        }
    }

    /// Pad so that after writing `len` more bytes the write cursor is aligned to `alignment`.
    fn align(&mut self, len: usize, alignment: usize) -> Result<(), BuildError> {
        self.min_align = self.min_align.max(alignment);
        let padding = padding_bytes(self.used_space() + len, alignment);
        let head = self.make_space(padding)?;
        self.buf[head..head + padding].fill(0);
        Ok(())
    }

    fn push_scalar<T: Scalar>(&mut self, value: T) -> Result<u32, BuildError> {
        self.align(T::SIZE, T::SIZE)?;
        let head = self.make_space(T::SIZE)?;
        value.write_le(&mut self.buf[head..head + T::SIZE]);
        Ok(self.used_space() as u32)
    }

    fn push_bytes(&mut self, bytes: &[u8], alignment: usize) -> Result<u32, BuildError> {
        self.align(bytes.len(), alignment)?;
        let head = self.make_space(bytes.len())?;
        self.buf[head..head + bytes.len()].copy_from_slice(bytes);
        Ok(self.used_space() as u32)
    }

    fn push_uoffset(&mut self, target: u32) -> Result<u32, BuildError> {
        self.align(SIZE_UOFFSET, SIZE_UOFFSET)?;
        let relative = (self.used_space() + SIZE_UOFFSET) as u32 - target;
        self.push_scalar(relative)
    }

    fn write_struct<S: FlatStruct>(&mut self, value: &S) -> Result<u32, BuildError> {
        self.align(S::SIZE, S::ALIGN)?;
        let head = self.make_space(S::SIZE)?;
        let dst = &mut self.buf[head..head + S::SIZE];
        dst.fill(0);
        value.write_to(dst);
        Ok(self.used_space() as u32)
    }

    /// Reserve `len` bytes in front of the used region, returning the new head.
    fn make_space(&mut self, len: usize) -> Result<usize, BuildError> {
        if len > self.head {
            self.grow(len)?;
        }
        self.head -= len;
        Ok(self.head)
    }

    fn grow(&mut self, additional: usize) -> Result<(), BuildError> {
        let used = self.used_space();
        let needed = used + additional;
        if needed > MAX_BUFFER_SIZE {
            return Err(BuildError::BufferTooLarge);
        }
        let mut new_len = self.buf.len().max(1);
        while new_len < needed {
            new_len *= 2;
        }
        let new_len = new_len.min(MAX_BUFFER_SIZE);

        let mut grown = vec![0u8; new_len];
        grown[new_len - used..].copy_from_slice(&self.buf[self.head..]);
        self.buf = grown;
        self.head = new_len - used;
        Ok(())
    }

    /// `len` bytes starting at the object written at `offset`
    fn bytes_at(&self, offset: u32, len: usize) -> Option<&[u8]> {
        let start = self.buf.len().checked_sub(offset as usize)?;
        self.buf.get(start..start + len)
    }

    /// Contents of the string written at `offset`
    fn string_at(&self, offset: u32) -> Option<&[u8]> {
        let len = u32::read_le(self.bytes_at(offset, SIZE_UOFFSET)?) as usize;
        let start = self.buf.len() - offset as usize + SIZE_UOFFSET;
        self.buf.get(start..start + len)
    }
}

/// An immutable, finished buffer handed off by [`FlatBuilder::into_finished`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedBuffer {
    data: Vec<u8>,
}

impl FinishedBuffer {
    /// The encoded bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the encoded bytes
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for FinishedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl std::ops::Deref for FinishedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}
