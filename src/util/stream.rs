//! Length-tagged numeric buffers returned by the importers.
//!
//! A [`TypedStream`] owns a contiguous sequence of plain values. Its length
//! is always the length of the backing storage; a default stream is empty
//! and owns no allocation. [`TypedStream::free`] releases the storage and
//! may be called any number of times.

use std::fmt;
use std::ops::{Deref, DerefMut};

use bytemuck::{Pod, Zeroable};

use super::math::DVec3;

/// Length-tagged, explicitly releasable buffer of `T`.
#[derive(Clone, PartialEq)]
pub struct TypedStream<T> {
    stream: Vec<T>,
}

/// Stream of doubles (solution fields, coordinates).
pub type DoubleStream = TypedStream<f64>;

/// Stream of integers (ids, connectivities, markers).
pub type IntStream = TypedStream<i32>;

/// Stream of 3D points.
pub type Vector3dStream = TypedStream<DVec3>;

impl<T> TypedStream<T> {
    /// Create an empty stream (length 0, no backing storage).
    #[inline]
    pub const fn new() -> Self {
        Self { stream: Vec::new() }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.stream.len()
    }

    /// Check if the stream holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    /// Release the backing storage and reset the length to 0.
    ///
    /// Freeing an empty or already freed stream is a no-op.
    pub fn free(&mut self) {
        self.stream = Vec::new();
    }

    /// Borrow the elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.stream
    }

    /// Borrow the elements mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.stream
    }

    /// Take ownership of the backing vector.
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.stream
    }
}

impl<T: Zeroable> TypedStream<T> {
    /// Allocate a stream of exactly `capacity` zero-initialised elements.
    pub fn create(capacity: usize) -> Self {
        Self {
            stream: bytemuck::allocation::zeroed_vec(capacity),
        }
    }
}

impl<T: Pod> TypedStream<T> {
    /// View the elements as raw native-endian bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.stream)
    }
}

impl<T> Default for TypedStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for TypedStream<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        &self.stream
    }
}

impl<T> DerefMut for TypedStream<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.stream
    }
}

impl<T> From<Vec<T>> for TypedStream<T> {
    fn from(stream: Vec<T>) -> Self {
        Self { stream }
    }
}

impl<T: Clone> From<&[T]> for TypedStream<T> {
    fn from(values: &[T]) -> Self {
        Self { stream: values.to_vec() }
    }
}

impl<T> FromIterator<T> for TypedStream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            stream: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for TypedStream<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.stream.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a TypedStream<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.stream.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for TypedStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 8;
        let mut list = f.debug_list();
        list.entries(self.stream.iter().take(PREVIEW));
        if self.stream.len() > PREVIEW {
            list.entry(&format_args!("... {} total", self.stream.len()));
        }
        list.finish()
    }
}
