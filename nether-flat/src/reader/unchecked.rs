//! Unchecked accessors for buffers that already passed the [`Verifier`].
//!
//! These skip every bounds, UTF-8 and vtable check. Calling them on a buffer
//! that was not verified against a schema describing the access is undefined
//! behavior.
//!
//! [`Verifier`]: crate::Verifier

use super::Table;
use crate::layout::{SIZE_UOFFSET, SIZE_VOFFSET, Scalar, field_index_to_offset};

/// Root table without any checks.
///
/// # Safety
///
/// `buf` must be a verified buffer whose root offset sits at position 0.
pub unsafe fn root_unchecked(buf: &[u8]) -> Table<'_> {
    // SAFETY: caller guarantees a verified buffer, so the root offset is in bounds.
    let relative = unsafe { read_u32(buf, 0) } as usize;
    Table { buf, pos: relative }
}

/// # Safety
///
/// `pos..pos + 4` must lie inside `buf`.
#[inline]
unsafe fn read_u32(buf: &[u8], pos: usize) -> u32 {
    // SAFETY: upheld by the caller.
    u32::read_le(unsafe { buf.get_unchecked(pos..pos + SIZE_UOFFSET) })
}

impl<'a> Table<'a> {
    /// Absolute position of `slot`'s inline data without checks.
    ///
    /// # Safety
    ///
    /// The table must come from a verified buffer.
    #[inline]
    pub unsafe fn field_pos_unchecked(&self, slot: u16) -> Option<usize> {
        // SAFETY: a verified table has an in-bounds soffset and vtable header.
        unsafe {
            let soffset = i32::read_le(self.buf.get_unchecked(self.pos..self.pos + 4));
            let vtable = (self.pos as i64 - soffset as i64) as usize;
            let vtable_size = u16::read_le(self.buf.get_unchecked(vtable..vtable + SIZE_VOFFSET));
            let entry = field_index_to_offset(slot) as usize;
            if entry >= vtable_size as usize {
                return None;
            }
            let at = vtable + entry;
            match u16::read_le(self.buf.get_unchecked(at..at + SIZE_VOFFSET)) {
                0 => None,
                offset => Some(self.pos + offset as usize),
            }
        }
    }

    /// Scalar in `slot` (or `default`) without checks.
    ///
    /// # Safety
    ///
    /// The table must come from a verified buffer and `slot` must hold a `T`.
    #[inline]
    pub unsafe fn get_unchecked<T: Scalar>(&self, slot: u16, default: T) -> T {
        // SAFETY: upheld by the caller.
        match unsafe { self.field_pos_unchecked(slot) } {
            Some(pos) => T::read_le(unsafe { self.buf.get_unchecked(pos..pos + T::SIZE) }),
            None => default,
        }
    }

    /// String referenced from `slot` without checks.
    ///
    /// # Safety
    ///
    /// The table must come from a verified buffer and `slot` must hold a string.
    pub unsafe fn get_str_unchecked(&self, slot: u16) -> Option<&'a str> {
        // SAFETY: verification checked the offset, length and UTF-8 contents.
        unsafe {
            let pos = self.field_pos_unchecked(slot)?;
            let target = pos + read_u32(self.buf, pos) as usize;
            let len = read_u32(self.buf, target) as usize;
            let start = target + SIZE_UOFFSET;
            Some(std::str::from_utf8_unchecked(
                self.buf.get_unchecked(start..start + len),
            ))
        }
    }

    /// Sub-table referenced from `slot` without checks.
    ///
    /// # Safety
    ///
    /// The table must come from a verified buffer and `slot` must hold a table.
    pub unsafe fn get_table_unchecked(&self, slot: u16) -> Option<Table<'a>> {
        // SAFETY: verification checked the offset.
        unsafe {
            let pos = self.field_pos_unchecked(slot)?;
            let target = pos + read_u32(self.buf, pos) as usize;
            Some(Table {
                buf: self.buf,
                pos: target,
            })
        }
    }
}
