//! Zero-copy reader
//!
//! Views ([`Table`], [`Vector`], `&str`) borrow the finished buffer and resolve
//! fields by offset arithmetic only; nothing is decoded ahead of time and no
//! read path allocates. Every access is bounds-checked and returns a
//! [`ReadError`] instead of reading past the buffer. Buffers that have already
//! been verified can use the `unsafe` accessors in [`unchecked`].
//!
//! # Buffer header
//!
//! ```text
//! [size prefix: u32]?  - only for size-prefixed buffers
//! [root: uoffset]      - relative to its own position
//! [identifier: [u8;4]]? - optional file identifier
//! ```

mod table;
pub mod unchecked;
mod vector;


pub use table::{Table, VTable};
pub use vector::{Inline, Vector, VectorElement, VectorIter};

use crate::error::{ReadError, ReadResult};
use crate::layout::{FILE_IDENTIFIER_LENGTH, SIZE_SIZE_PREFIX, SIZE_UOFFSET, Scalar};

/// Root table of a buffer whose root offset sits at position 0.
pub fn root(buf: &[u8]) -> ReadResult<Table<'_>> {
    root_at(buf, 0)
}

/// Root table of a buffer whose root offset sits at `offset`.
pub fn root_at(buf: &[u8], offset: usize) -> ReadResult<Table<'_>> {
    let needed = offset + SIZE_UOFFSET;
    if buf.len() < needed {
        return Err(ReadError::Truncated {
            needed,
            actual: buf.len(),
        });
    }
    let pos = follow_uoffset(buf, offset)?;
    Table::new(buf, pos)
}

/// Root table after checking the 4-byte file identifier.
pub fn root_with_identifier<'a>(
    buf: &'a [u8],
    identifier: &[u8; FILE_IDENTIFIER_LENGTH],
) -> ReadResult<Table<'a>> {
    check_identifier(buf, identifier, false)?;
    root(buf)
}

/// Root table of a size-prefixed buffer.
///
/// Bytes past the declared size are ignored; positions stay relative to the
/// start of `buf`.
pub fn size_prefixed_root(buf: &[u8]) -> ReadResult<Table<'_>> {
    let buf = size_prefixed_region(buf)?;
    root_at(buf, SIZE_SIZE_PREFIX)
}

/// The size prefix plus the bytes it declares.
pub fn size_prefixed_region(buf: &[u8]) -> ReadResult<&[u8]> {
    let size = read_scalar::<u32>(buf, 0).map_err(|_| ReadError::Truncated {
        needed: SIZE_SIZE_PREFIX,
        actual: buf.len(),
    })? as usize;
    let end = SIZE_SIZE_PREFIX
        .checked_add(size)
        .ok_or(ReadError::InvalidOffset { pos: 0 })?;
    if end > buf.len() {
        return Err(ReadError::Truncated {
            needed: end,
            actual: buf.len(),
        });
    }
    if end < buf.len() {
        tracing::warn!(
            declared = size,
            actual = buf.len() - SIZE_SIZE_PREFIX,
            "size prefix is shorter than the buffer; ignoring trailing bytes"
        );
    }
    Ok(&buf[..end])
}

/// The file identifier following the root offset, if the buffer is long enough.
pub fn buffer_identifier(buf: &[u8], size_prefixed: bool) -> Option<[u8; FILE_IDENTIFIER_LENGTH]> {
    let start = SIZE_UOFFSET + if size_prefixed { SIZE_SIZE_PREFIX } else { 0 };
    let bytes = buf.get(start..start + FILE_IDENTIFIER_LENGTH)?;
    let mut identifier = [0u8; FILE_IDENTIFIER_LENGTH];
    identifier.copy_from_slice(bytes);
    Some(identifier)
}

/// Whether the buffer carries `identifier` after its root offset.
pub fn buffer_has_identifier(
    buf: &[u8],
    identifier: &[u8; FILE_IDENTIFIER_LENGTH],
    size_prefixed: bool,
) -> bool {
    buffer_identifier(buf, size_prefixed).as_ref() == Some(identifier)
}

pub(crate) fn check_identifier(
    buf: &[u8],
    identifier: &[u8; FILE_IDENTIFIER_LENGTH],
    size_prefixed: bool,
) -> ReadResult<()> {
    let found = buffer_identifier(buf, size_prefixed).ok_or(ReadError::Truncated {
        needed: SIZE_UOFFSET + FILE_IDENTIFIER_LENGTH,
        actual: buf.len(),
    })?;
    if &found != identifier {
        return Err(ReadError::IdentifierMismatch {
            expected: *identifier,
            found,
        });
    }
    Ok(())
}

// ============================================================================
// Checked primitives
// ============================================================================

/// `len` bytes at `pos`
#[inline]
pub(crate) fn slice_at(buf: &[u8], pos: usize, len: usize) -> ReadResult<&[u8]> {
    pos.checked_add(len)
        .and_then(|end| buf.get(pos..end))
        .ok_or(ReadError::OutOfBounds {
            pos,
            len,
            buffer_len: buf.len(),
        })
}

#[inline]
pub(crate) fn read_scalar<T: Scalar>(buf: &[u8], pos: usize) -> ReadResult<T> {
    Ok(T::read_le(slice_at(buf, pos, T::SIZE)?))
}

/// Resolve the uoffset stored at `pos` to the absolute position of its target.
#[inline]
pub(crate) fn follow_uoffset(buf: &[u8], pos: usize) -> ReadResult<usize> {
    let relative = read_scalar::<u32>(buf, pos)? as usize;
    if relative == 0 {
        return Err(ReadError::InvalidOffset { pos });
    }
    let target = pos + relative;
    if target >= buf.len() {
        return Err(ReadError::OutOfBounds {
            pos: target,
            len: 1,
            buffer_len: buf.len(),
        });
    }
    Ok(target)
}

/// Bytes of the length-prefixed string starting at `pos` (terminator excluded).
pub(crate) fn read_byte_string(buf: &[u8], pos: usize) -> ReadResult<&[u8]> {
    let len = read_scalar::<u32>(buf, pos)? as usize;
    slice_at(buf, pos + SIZE_UOFFSET, len)
}

/// UTF-8 contents of the length-prefixed string starting at `pos`.
pub(crate) fn read_str(buf: &[u8], pos: usize) -> ReadResult<&str> {
    let bytes = read_byte_string(buf, pos)?;
    std::str::from_utf8(bytes).map_err(|_| ReadError::InvalidUtf8 { pos })
}
