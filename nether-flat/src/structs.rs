//! Fixed-size inline aggregates.
//!
//! Structs hold only scalars (or other structs) at fixed byte positions and no
//! offsets. They are embedded directly in a table's inline region, in a vector,
//! or written standalone as a union value, and never carry a vtable.

/// A fixed-size struct with an explicit little-endian byte layout.
///
/// Implementations write every field at its declared offset and zero the
/// padding, so identical values always encode to identical bytes.
///
/// # Example
///
/// ```
/// use nether_flat::FlatStruct;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// struct Point {
///     x: i16,
///     y: i16,
/// }
///
/// impl FlatStruct for Point {
///     const SIZE: usize = 4;
///     const ALIGN: usize = 2;
///
///     fn write_to(&self, dst: &mut [u8]) {
///         dst[0..2].copy_from_slice(&self.x.to_le_bytes());
///         dst[2..4].copy_from_slice(&self.y.to_le_bytes());
///     }
///
///     fn read_from(src: &[u8]) -> Self {
///         Self {
///             x: i16::from_le_bytes([src[0], src[1]]),
///             y: i16::from_le_bytes([src[2], src[3]]),
///         }
///     }
/// }
///
/// let mut bytes = [0u8; Point::SIZE];
/// Point { x: 3, y: -1 }.write_to(&mut bytes);
/// assert_eq!(Point::read_from(&bytes), Point { x: 3, y: -1 });
/// ```
pub trait FlatStruct: Copy + Sized {
    /// Encoded size in bytes, including trailing padding
    const SIZE: usize;

    /// Required alignment (largest member alignment)
    const ALIGN: usize;

    /// Write the struct into `dst[..SIZE]`. Padding bytes must be zeroed.
    fn write_to(&self, dst: &mut [u8]);

    /// Read the struct from `src[..SIZE]`.
    fn read_from(src: &[u8]) -> Self;
}
