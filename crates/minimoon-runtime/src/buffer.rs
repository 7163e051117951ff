//! Growable single-kind buffers
//!
//! Every array kind the compiler emits is an instantiation of [`TypedBuffer`].
//! All kinds share one growth policy: a buffer built with `length` elements
//! starts with `2 * length + 1` slots, and an append into a full buffer grows
//! it to `2 * capacity + 1` slots.
//!
//! [`AnyBuffer`] wraps the instantiations in a tagged enum so that queries
//! which don't care about the element kind (the length probe) can be answered
//! without knowing the concrete type behind a handle.

use derive_more::Display;
use tracing::trace;

use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::Handle;

/// Element kinds supported by the runtime
#[repr(u8)]
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    #[display("int")]
    Int = 0,
    #[display("int64")]
    Int64 = 1,
    #[display("double")]
    Double = 2,
    #[display("float")]
    Float = 3,
    #[display("bool")]
    Bool = 4,
    #[display("char")]
    Char = 5,
    #[display("ptr")]
    Ptr = 6,
}

impl ElementKind {
    pub const ALL: [ElementKind; 7] = [
        ElementKind::Int,
        ElementKind::Int64,
        ElementKind::Double,
        ElementKind::Float,
        ElementKind::Bool,
        ElementKind::Char,
        ElementKind::Ptr,
    ];
}

/// Capacity reserved for a buffer holding `length` elements (`2 * length + 1`).
fn grown_capacity(length: i32) -> RuntimeResult<i32> {
    length
        .checked_mul(2)
        .and_then(|doubled| doubled.checked_add(1))
        .ok_or_else(|| RuntimeError::out_of_memory(length as usize * 2 + 1))
}

/// Growable array with tracked length and capacity
#[derive(Debug, Clone, PartialEq)]
pub struct TypedBuffer<T> {
    data: Vec<T>,
    capacity: i32,
    reallocations: u32,
}

impl<T: Element> TypedBuffer<T> {
    /// Create a buffer of `length` elements, each set to `fill`.
    pub fn with_fill(length: i32, fill: T) -> RuntimeResult<Self> {
        if length < 0 {
            return Err(RuntimeError::InvalidLength { length });
        }

        let capacity = grown_capacity(length)?;
        let mut data = Vec::new();
        data.try_reserve_exact(capacity as usize)
            .map_err(|_| RuntimeError::out_of_memory(capacity as usize))?;
        data.resize(length as usize, fill);

        Ok(Self {
            data,
            capacity,
            reallocations: 0,
        })
    }

    /// Get the current length
    pub fn len(&self) -> i32 {
        // `data` never holds more than `capacity` elements, which is an i32.
        self.data.len() as i32
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the current capacity
    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// Number of times the storage has been grown since construction
    pub fn reallocations(&self) -> u32 {
        self.reallocations
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Append `value`, growing the storage to `2 * capacity + 1` when full.
    pub fn push(&mut self, value: T) -> RuntimeResult<()> {
        let length = self.len();
        if length >= self.capacity {
            let new_capacity = grown_capacity(self.capacity)?;
            self.data
                .try_reserve_exact((new_capacity - length) as usize)
                .map_err(|_| RuntimeError::out_of_memory(new_capacity as usize))?;

            trace!(
                kind = %T::KIND,
                old_capacity = self.capacity,
                new_capacity,
                "buffer grown"
            );
            self.capacity = new_capacity;
            self.reallocations += 1;
        }

        self.data.push(value);
        Ok(())
    }

    /// Read the element at `index`
    pub fn get(&self, index: i32) -> RuntimeResult<T> {
        let slot = self.slot(index)?;
        Ok(self.data[slot])
    }

    /// Overwrite the element at `index`
    pub fn put(&mut self, index: i32, value: T) -> RuntimeResult<()> {
        let slot = self.slot(index)?;
        self.data[slot] = value;
        Ok(())
    }

    fn slot(&self, index: i32) -> RuntimeResult<usize> {
        let length = self.len();
        if index < 0 || index >= length {
            return Err(RuntimeError::index_out_of_range(index, length));
        }
        Ok(index as usize)
    }
}

/// A value that can be stored in a [`TypedBuffer`]
pub trait Element: Copy + std::fmt::Debug + 'static {
    const KIND: ElementKind;

    fn wrap(buffer: TypedBuffer<Self>) -> AnyBuffer;

    fn unwrap_ref(buffer: &AnyBuffer) -> Option<&TypedBuffer<Self>>;

    fn unwrap_mut(buffer: &mut AnyBuffer) -> Option<&mut TypedBuffer<Self>>;
}

/// A buffer of any element kind
#[derive(Debug, Clone, PartialEq)]
pub enum AnyBuffer {
    Int(TypedBuffer<i32>),
    Int64(TypedBuffer<i64>),
    Double(TypedBuffer<f64>),
    Float(TypedBuffer<f32>),
    Bool(TypedBuffer<bool>),
    Char(TypedBuffer<u8>),
    Ptr(TypedBuffer<Handle>),
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const KIND: ElementKind = ElementKind::$variant;

            fn wrap(buffer: TypedBuffer<Self>) -> AnyBuffer {
                AnyBuffer::$variant(buffer)
            }

            fn unwrap_ref(buffer: &AnyBuffer) -> Option<&TypedBuffer<Self>> {
                match buffer {
                    AnyBuffer::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn unwrap_mut(buffer: &mut AnyBuffer) -> Option<&mut TypedBuffer<Self>> {
                match buffer {
                    AnyBuffer::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(i32, Int);
impl_element!(i64, Int64);
impl_element!(f64, Double);
impl_element!(f32, Float);
impl_element!(bool, Bool);
impl_element!(u8, Char);
impl_element!(Handle, Ptr);

macro_rules! each_buffer {
    ($buffer:expr, $inner:ident => $body:expr) => {
        match $buffer {
            AnyBuffer::Int($inner) => $body,
            AnyBuffer::Int64($inner) => $body,
            AnyBuffer::Double($inner) => $body,
            AnyBuffer::Float($inner) => $body,
            AnyBuffer::Bool($inner) => $body,
            AnyBuffer::Char($inner) => $body,
            AnyBuffer::Ptr($inner) => $body,
        }
    };
}

impl AnyBuffer {
    /// Element count of the wrapped buffer, whatever its kind
    pub fn len(&self) -> i32 {
        each_buffer!(self, inner => inner.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> i32 {
        each_buffer!(self, inner => inner.capacity())
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            AnyBuffer::Int(_) => ElementKind::Int,
            AnyBuffer::Int64(_) => ElementKind::Int64,
            AnyBuffer::Double(_) => ElementKind::Double,
            AnyBuffer::Float(_) => ElementKind::Float,
            AnyBuffer::Bool(_) => ElementKind::Bool,
            AnyBuffer::Char(_) => ElementKind::Char,
            AnyBuffer::Ptr(_) => ElementKind::Ptr,
        }
    }
}
