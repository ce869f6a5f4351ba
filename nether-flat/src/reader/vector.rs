//! Vector views

use std::marker::PhantomData;

use super::{Table, follow_uoffset, read_scalar, read_str, slice_at};
use crate::error::{ReadError, ReadResult};
use crate::layout::{SIZE_UOFFSET, Scalar};
use crate::structs::FlatStruct;

/// An element type that can be read out of a vector.
///
/// Scalars and inline structs ([`Inline`]) are stored by value; tables and
/// strings are stored as uoffsets and resolved on access.
pub trait VectorElement<'a> {
    /// Bytes each element occupies in the vector body
    const SIZE: usize;

    /// What an element reads as
    type Item;

    /// Read the element stored at `pos`.
    fn read(buf: &'a [u8], pos: usize) -> ReadResult<Self::Item>;
}

macro_rules! impl_scalar_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<'a> VectorElement<'a> for $ty {
                const SIZE: usize = <$ty as Scalar>::SIZE;
                type Item = $ty;

                #[inline]
                fn read(buf: &'a [u8], pos: usize) -> ReadResult<$ty> {
                    read_scalar(buf, pos)
                }
            }
        )*
    };
}

impl_scalar_element!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, bool);

impl<'a> VectorElement<'a> for Table<'a> {
    const SIZE: usize = SIZE_UOFFSET;
    type Item = Table<'a>;

    fn read(buf: &'a [u8], pos: usize) -> ReadResult<Table<'a>> {
        Table::new(buf, follow_uoffset(buf, pos)?)
    }
}

impl<'a> VectorElement<'a> for &'a str {
    const SIZE: usize = SIZE_UOFFSET;
    type Item = &'a str;

    fn read(buf: &'a [u8], pos: usize) -> ReadResult<&'a str> {
        read_str(buf, follow_uoffset(buf, pos)?)
    }
}

/// Element marker for vectors of inline structs.
#[derive(Debug, Clone, Copy)]
pub struct Inline<S>(PhantomData<S>);

impl<'a, S: FlatStruct> VectorElement<'a> for Inline<S> {
    const SIZE: usize = S::SIZE;
    type Item = S;

    fn read(buf: &'a [u8], pos: usize) -> ReadResult<S> {
        Ok(S::read_from(slice_at(buf, pos, S::SIZE)?))
    }
}

/// A length-prefixed vector inside a finished buffer.
#[derive(Debug)]
pub struct Vector<'a, T> {
    buf: &'a [u8],
    pos: usize,
    len: usize,
    _elem: PhantomData<T>,
}

impl<T> Clone for Vector<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Vector<'_, T> {}

impl<'a, T: VectorElement<'a>> Vector<'a, T> {
    /// A vector whose length prefix sits at `pos`. The whole body must fit in `buf`.
    pub fn at(buf: &'a [u8], pos: usize) -> ReadResult<Self> {
        let len = read_scalar::<u32>(buf, pos)? as usize;
        let body = len.checked_mul(T::SIZE).ok_or(ReadError::OutOfBounds {
            pos,
            len: usize::MAX,
            buffer_len: buf.len(),
        })?;
        slice_at(buf, pos + SIZE_UOFFSET, body)?;
        Ok(Self {
            buf,
            pos,
            len,
            _elem: PhantomData,
        })
    }

    /// Position of the length prefix
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element `index`, or [`ReadError::IndexOutOfRange`].
    pub fn get(&self, index: usize) -> ReadResult<T::Item> {
        if index >= self.len {
            return Err(ReadError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        T::read(self.buf, self.element_pos(index))
    }

    /// Iterate elements in order.
    pub fn iter(&self) -> VectorIter<'a, T> {
        VectorIter {
            vector: *self,
            front: 0,
            back: self.len,
        }
    }

    /// Collect every element, failing on the first unreadable one.
    pub fn to_vec(&self) -> ReadResult<Vec<T::Item>> {
        self.iter().collect()
    }

    #[inline]
    fn element_pos(&self, index: usize) -> usize {
        self.pos + SIZE_UOFFSET + index * T::SIZE
    }
}

impl<'a> Vector<'a, u8> {
    /// The vector body as a byte slice
    pub fn bytes(&self) -> &'a [u8] {
        let start = self.pos + SIZE_UOFFSET;
        &self.buf[start..start + self.len]
    }
}

impl<'a, T: VectorElement<'a>> IntoIterator for Vector<'a, T> {
    type Item = ReadResult<T::Item>;
    type IntoIter = VectorIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`Vector`]
#[derive(Debug)]
pub struct VectorIter<'a, T> {
    vector: Vector<'a, T>,
    front: usize,
    back: usize,
}

impl<'a, T: VectorElement<'a>> Iterator for VectorIter<'a, T> {
    type Item = ReadResult<T::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = T::read(self.vector.buf, self.vector.element_pos(self.front));
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<'a, T: VectorElement<'a>> DoubleEndedIterator for VectorIter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(T::read(self.vector.buf, self.vector.element_pos(self.back)))
    }
}

impl<'a, T: VectorElement<'a>> ExactSizeIterator for VectorIter<'a, T> {}
