//! Safe entry points for runtime primitives
//!
//! [`Runtime`] owns a handle table and implements every primitive the
//! compiler emits calls to, returning [`RuntimeResult`] for anything a caller
//! can get wrong. The C ABI in [`crate::ffi`] forwards to the process-wide
//! instance from [`Runtime::global`].

use std::sync::{Arc, LazyLock};

use crate::buffer::{AnyBuffer, Element, TypedBuffer};
use crate::convert::ToByteString;
use crate::error::RuntimeResult;
use crate::handle::{Handle, HandleStats, HandleTable, Object, ObjectKind, kind_mismatch};
use crate::string::ByteString;

static GLOBAL_RUNTIME: LazyLock<Runtime> = LazyLock::new(Runtime::new);

/// Runtime context that owns all buffers and strings
#[derive(Default)]
pub struct Runtime {
    handles: HandleTable,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            handles: HandleTable::new(),
        }
    }

    /// The instance shared by all C ABI calls in this process
    pub fn global() -> &'static Runtime {
        &GLOBAL_RUNTIME
    }

    // Buffers

    /// Create a buffer of `length` copies of `fill`
    pub fn make_array<T: Element>(&self, length: i32, fill: T) -> RuntimeResult<Handle> {
        let buffer = TypedBuffer::with_fill(length, fill)?;
        Ok(self.handles.insert(Object::Buffer(T::wrap(buffer))))
    }

    pub fn array_push<T: Element>(&self, handle: Handle, value: T) -> RuntimeResult<()> {
        self.with_array_mut(handle, |buffer: &mut TypedBuffer<T>| buffer.push(value))
    }

    pub fn array_get<T: Element>(&self, handle: Handle, index: i32) -> RuntimeResult<T> {
        self.with_array(handle, |buffer: &TypedBuffer<T>| buffer.get(index))
    }

    pub fn array_put<T: Element>(&self, handle: Handle, index: i32, value: T) -> RuntimeResult<()> {
        self.with_array_mut(handle, |buffer: &mut TypedBuffer<T>| buffer.put(index, value))
    }

    /// Length of any buffer, regardless of its element kind
    pub fn array_length(&self, handle: Handle) -> RuntimeResult<i32> {
        self.with_any_array(handle, |buffer| Ok(buffer.len()))
    }

    /// Run `f` against the buffer behind `handle`, of whatever kind it is
    pub fn with_any_array<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&AnyBuffer) -> RuntimeResult<R>,
    ) -> RuntimeResult<R> {
        self.handles.with(handle, |object| match object {
            Object::Buffer(buffer) => f(buffer),
            other => Err(kind_mismatch(handle, ObjectKind::AnyBuffer, other.kind())),
        })
    }

    /// Run `f` against the buffer behind `handle`, which must hold `T`s
    pub fn with_array<T: Element, R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&TypedBuffer<T>) -> RuntimeResult<R>,
    ) -> RuntimeResult<R> {
        self.handles.with(handle, |object| {
            let buffer = match object {
                Object::Buffer(buffer) => T::unwrap_ref(buffer),
                Object::String(_) => None,
            };
            match buffer {
                Some(buffer) => f(buffer),
                None => Err(kind_mismatch(handle, ObjectKind::Buffer(T::KIND), object.kind())),
            }
        })
    }

    fn with_array_mut<T: Element, R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut TypedBuffer<T>) -> RuntimeResult<R>,
    ) -> RuntimeResult<R> {
        self.handles.with_mut(handle, |object| {
            let found = object.kind();
            let buffer = match object {
                Object::Buffer(buffer) => T::unwrap_mut(buffer),
                Object::String(_) => None,
            };
            match buffer {
                Some(buffer) => f(buffer),
                None => Err(kind_mismatch(handle, ObjectKind::Buffer(T::KIND), found)),
            }
        })
    }

    // Strings

    /// Create a string from literal text (up to the first NUL, if any)
    pub fn create_string(&self, text: &[u8]) -> RuntimeResult<Handle> {
        let string = ByteString::from_bytes(text)?;
        Ok(self.insert_string(string))
    }

    pub fn insert_string(&self, string: ByteString) -> Handle {
        self.handles.insert(Object::String(Arc::new(string)))
    }

    /// Shared reference to the string behind `handle`
    pub fn string(&self, handle: Handle) -> RuntimeResult<Arc<ByteString>> {
        self.handles.with(handle, |object| match object {
            Object::String(string) => Ok(Arc::clone(string)),
            other => Err(kind_mismatch(handle, ObjectKind::String, other.kind())),
        })
    }

    pub fn string_length(&self, handle: Handle) -> RuntimeResult<i32> {
        Ok(self.string(handle)?.len())
    }

    /// Concatenate two strings into a new one
    pub fn string_concat(&self, left: Handle, right: Handle) -> RuntimeResult<Handle> {
        let left = self.string(left)?;
        let right = self.string(right)?;
        let joined = ByteString::concat(&left, &right)?;
        Ok(self.insert_string(joined))
    }

    pub fn char_at(&self, handle: Handle, index: i32) -> RuntimeResult<u8> {
        self.string(handle)?.char_at(index)
    }

    /// Allocate the textual form of `value` as a new string
    pub fn to_string<V: ToByteString>(&self, value: V) -> Handle {
        self.insert_string(value.to_byte_string())
    }

    // Lifetime

    pub fn release(&self, handle: Handle) -> RuntimeResult<()> {
        self.handles.release(handle)
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        self.handles.is_valid(handle)
    }

    /// Drop every object owned by this runtime
    pub fn clear_all(&self) {
        self.handles.clear_all()
    }

    pub fn stats(&self) -> HandleStats {
        self.handles.stats()
    }
}
