//! Layout rules shared by the builder and the reader
//!
//! Every integer is little-endian. Cross references are relative:
//!
//! ```text
//! uoffset: u32  - unsigned distance from the offset's own position to its target
//!                 (always points towards the end of the buffer)
//! soffset: i32  - signed distance from a table to its vtable (table_pos - vtable_pos)
//! voffset: u16  - byte offset of a field inside its table, 0 = absent
//! ```
//!
//! Values of size N are always stored at a position that is a multiple of N.

use std::marker::PhantomData;

/// Size of a `uoffset` in bytes
pub const SIZE_UOFFSET: usize = 4;

/// Size of an `soffset` in bytes
pub const SIZE_SOFFSET: usize = 4;

/// Size of a `voffset` in bytes
pub const SIZE_VOFFSET: usize = 2;

/// Length of the optional file identifier following the root offset
pub const FILE_IDENTIFIER_LENGTH: usize = 4;

/// Size of the optional length prefix of size-prefixed buffers
pub const SIZE_SIZE_PREFIX: usize = 4;

/// Number of u16 header entries at the start of every vtable
/// (vtable byte size, table inline byte size)
pub const VTABLE_METADATA_FIELDS: usize = 2;

/// Highest slot whose entry still fits a 64 KiB vtable
pub const MAX_SLOT: u16 = ((u16::MAX as usize - VTABLE_METADATA_FIELDS * SIZE_VOFFSET) / SIZE_VOFFSET - 1) as u16;

/// Largest buffer the builder will produce (offsets must fit in an i32)
pub const MAX_BUFFER_SIZE: usize = (1 << 31) - 1;

/// Byte offset of a field slot's entry inside a vtable.
#[inline]
pub const fn field_index_to_offset(slot: u16) -> u16 {
    ((VTABLE_METADATA_FIELDS + slot as usize) * SIZE_VOFFSET) as u16
}

/// Inverse of [`field_index_to_offset`].
#[inline]
pub const fn offset_to_field_index(voffset: u16) -> u16 {
    (voffset / SIZE_VOFFSET as u16) - VTABLE_METADATA_FIELDS as u16
}

/// Zero bytes needed before a write of `scalar_size` bytes when `buf_size`
/// bytes are already used at the back of the buffer.
///
/// `scalar_size` must be a power of two.
#[inline]
pub const fn padding_bytes(buf_size: usize, scalar_size: usize) -> usize {
    (!buf_size).wrapping_add(1) & scalar_size.wrapping_sub(1)
}

// ============================================================================
// Scalars
// ============================================================================

/// A fixed-width value stored inline in little-endian byte order.
pub trait Scalar: Copy + PartialEq + std::fmt::Debug + Sized {
    /// Encoded width in bytes (also the required alignment)
    const SIZE: usize;

    /// Write the value into `dst[..SIZE]`
    fn write_le(self, dst: &mut [u8]);

    /// Read a value from `src[..SIZE]`
    fn read_le(src: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_le(self, dst: &mut [u8]) {
                    dst[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(src: &[u8]) -> Self {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(&src[..Self::SIZE]);
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Scalar for bool {
    const SIZE: usize = 1;

    #[inline]
    fn write_le(self, dst: &mut [u8]) {
        dst[0] = self as u8;
    }

    /// Any non-zero byte reads as `true`
    #[inline]
    fn read_le(src: &[u8]) -> Self {
        src[0] != 0
    }
}

// ============================================================================
// Offsets handed out by the builder
// ============================================================================

/// Identity of the builder (and its reset generation) that produced an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuilderId {
    pub(crate) id: u32,
    pub(crate) generation: u32,
}

/// Marker for offsets to tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOffset {}

/// Marker for offsets to strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrOffset {}

/// Marker for offsets to standalone structs (union values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructOffset {}

/// Marker for offsets to vectors with element type `T`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorOffset<T>(PhantomData<T>);

/// Opaque handle to an object already written by a [`FlatBuilder`].
///
/// The wrapped value is the object's distance from the end of the buffer at the
/// time it was written; it stays valid while the buffer grows at the front.
/// Handles are bound to the builder that created them. Callers only pass
/// them back into the builder; the raw position is not exposed:
///
/// ```compile_fail
/// let mut builder = nether_flat::FlatBuilder::new();
/// let name = builder.create_string("hidden").unwrap();
/// let _ = name.value();
/// ```
///
/// [`FlatBuilder`]: crate::FlatBuilder
#[derive(Debug)]
pub struct Offset<K> {
    value: u32,
    owner: BuilderId,
    _kind: PhantomData<K>,
}

impl<K> Offset<K> {
    pub(crate) fn new(value: u32, owner: BuilderId) -> Self {
        Self {
            value,
            owner,
            _kind: PhantomData,
        }
    }

    /// Distance of the object from the end of the buffer
    pub(crate) fn value(&self) -> u32 {
        self.value
    }

    pub(crate) fn owner(&self) -> BuilderId {
        self.owner
    }

    /// Drop the kind marker (e.g. to store heterogeneous union values)
    pub fn as_untyped(&self) -> Offset<()> {
        Offset::new(self.value, self.owner)
    }
}

impl<K> Clone for Offset<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Offset<K> {}

impl<K> PartialEq for Offset<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.owner == other.owner
    }
}

impl<K> Eq for Offset<K> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_index_to_offset() {
        assert_eq!(field_index_to_offset(0), 4);
        assert_eq!(field_index_to_offset(1), 6);
        assert_eq!(field_index_to_offset(7), 18);
        assert_eq!(offset_to_field_index(4), 0);
        assert_eq!(offset_to_field_index(18), 7);
        // Entry for the last slot ends inside a u16-sized vtable
        assert_eq!(field_index_to_offset(MAX_SLOT) as usize + SIZE_VOFFSET, u16::MAX as usize - 1);
    }

    #[test]
    fn test_padding_bytes() {
        assert_eq!(padding_bytes(0, 4), 0);
        assert_eq!(padding_bytes(1, 4), 3);
        assert_eq!(padding_bytes(2, 4), 2);
        assert_eq!(padding_bytes(3, 4), 1);
        assert_eq!(padding_bytes(4, 4), 0);
        assert_eq!(padding_bytes(5, 8), 3);
        assert_eq!(padding_bytes(7, 1), 0);
    }

    #[test]
    fn test_scalar_little_endian() {
        let mut buf = [0u8; 8];
        0x1234_5678u32.write_le(&mut buf);
        assert_eq!(&buf[..4], &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(u32::read_le(&buf), 0x1234_5678);

        (-2i16).write_le(&mut buf);
        assert_eq!(&buf[..2], &[0xFE, 0xFF]);
        assert_eq!(i16::read_le(&buf), -2);

        1.5f64.write_le(&mut buf);
        assert_eq!(f64::read_le(&buf), 1.5);
    }

    #[test]
    fn test_bool_reads_any_nonzero_as_true() {
        assert!(bool::read_le(&[1]));
        assert!(bool::read_le(&[0x80]));
        assert!(!bool::read_le(&[0]));
    }
}
