//! Handle-based ownership for runtime objects
//!
//! Generated code never sees a Rust reference. Every buffer and string lives
//! in a [`HandleTable`] and is addressed through an opaque [`Handle`].
//!
//! ## Lifetime
//!
//! The table is a region: objects stay alive until they are released one by
//! one with [`HandleTable::release`], or until the whole region is cleared
//! or dropped. Nothing is collected implicitly.
//!
//! ## Validation
//!
//! Each entry remembers what it is, so an operation applied to a handle of
//! the wrong kind, a released handle, or the null handle is reported as
//! [`RuntimeError::InvalidHandle`] instead of touching unrelated memory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use derive_more::Display;
use tracing::debug;

use crate::buffer::{AnyBuffer, ElementKind};
use crate::error::{RuntimeError, RuntimeResult};
use crate::string::ByteString;

/// An opaque reference to a runtime object
#[repr(transparent)]
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[display("#{_0}")]
pub struct Handle(u64);

impl Handle {
    /// The null handle; never refers to an object
    pub const NULL: Handle = Handle(0);

    pub const fn from_raw(raw: u64) -> Self {
        Handle(raw)
    }

    pub const fn into_raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A value owned by the handle table
#[derive(Debug, Clone)]
pub enum Object {
    Buffer(AnyBuffer),
    /// Strings are immutable, so readers share them instead of copying.
    String(Arc<ByteString>),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Buffer(buffer) => ObjectKind::Buffer(buffer.kind()),
            Object::String(_) => ObjectKind::String,
        }
    }
}

/// What an operation expected to find behind a handle
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    #[display("{_0} array")]
    Buffer(ElementKind),
    #[display("array")]
    AnyBuffer,
    #[display("string")]
    String,
}

/// Why a handle was rejected
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleFault {
    #[display("null handle")]
    Null,
    #[display("no live object")]
    Unknown,
    #[display("expected {expected}, found {found}")]
    KindMismatch {
        expected: ObjectKind,
        found: ObjectKind,
    },
}

/// Allocation counters for a handle table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub allocated: u64,
    pub released: u64,
    pub peak: u64,
}

impl HandleStats {
    pub fn live(&self) -> u64 {
        self.allocated.saturating_sub(self.released)
    }
}

/// Handle table that owns every runtime object
pub struct HandleTable {
    table: DashMap<u64, Object>,
    counter: AtomicU64,
    stats: Mutex<HandleStats>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
            counter: AtomicU64::new(1), // 0 is the null handle
            stats: Mutex::new(HandleStats::default()),
        }
    }

    /// Store an object and return a fresh handle for it
    pub fn insert(&self, object: Object) -> Handle {
        let handle = Handle(self.counter.fetch_add(1, Ordering::Relaxed));
        debug!(%handle, kind = %object.kind(), "allocated");
        self.table.insert(handle.0, object);

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.allocated += 1;
        stats.peak = stats.peak.max(stats.live());

        handle
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        !handle.is_null() && self.table.contains_key(&handle.0)
    }

    /// Run `f` against the object behind `handle`.
    ///
    /// The table entry stays locked while `f` runs; `f` must not call back
    /// into the table.
    pub fn with<T>(
        &self,
        handle: Handle,
        f: impl FnOnce(&Object) -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        check_not_null(handle)?;
        let entry = self
            .table
            .get(&handle.0)
            .ok_or_else(|| RuntimeError::invalid_handle(handle, HandleFault::Unknown))?;
        f(entry.value())
    }

    /// Mutable variant of [`HandleTable::with`], under the same locking rule.
    pub fn with_mut<T>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut Object) -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        check_not_null(handle)?;
        let mut entry = self
            .table
            .get_mut(&handle.0)
            .ok_or_else(|| RuntimeError::invalid_handle(handle, HandleFault::Unknown))?;
        f(entry.value_mut())
    }

    /// Release a handle and drop the object behind it
    pub fn release(&self, handle: Handle) -> RuntimeResult<()> {
        check_not_null(handle)?;
        let Some((_, object)) = self.table.remove(&handle.0) else {
            return Err(RuntimeError::invalid_handle(handle, HandleFault::Unknown));
        };
        debug!(%handle, kind = %object.kind(), "released");

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.released += 1;
        Ok(())
    }

    /// Drop every object in the region
    pub fn clear_all(&self) {
        let live = self.table.len() as u64;
        self.table.clear();

        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.released += live;
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn stats(&self) -> HandleStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

fn check_not_null(handle: Handle) -> RuntimeResult<()> {
    if handle.is_null() {
        return Err(RuntimeError::invalid_handle(handle, HandleFault::Null));
    }
    Ok(())
}

/// Error for a handle whose object is not what the caller expected
pub(crate) fn kind_mismatch(handle: Handle, expected: ObjectKind, found: ObjectKind) -> RuntimeError {
    RuntimeError::invalid_handle(handle, HandleFault::KindMismatch { expected, found })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Element, TypedBuffer};

    fn int_buffer(length: i32) -> Object {
        Object::Buffer(i32::wrap(TypedBuffer::with_fill(length, 0).unwrap()))
    }

    fn string(text: &[u8]) -> Object {
        Object::String(Arc::new(ByteString::from_bytes(text).unwrap()))
    }

    #[test]
    fn test_handle_creation_and_validity() {
        let table = HandleTable::new();
        let handle = table.insert(int_buffer(3));
        assert_ne!(handle, Handle::NULL);
        assert!(table.is_valid(handle));

        table.release(handle).unwrap();
        assert!(!table.is_valid(handle));
    }

    #[test]
    fn test_handles_are_unique() {
        let table = HandleTable::new();
        let a = table.insert(string(b"same"));
        let b = table.insert(string(b"same"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_null_handle_rejected() {
        let table = HandleTable::new();
        assert!(!table.is_valid(Handle::NULL));
        assert_eq!(
            table.with(Handle::NULL, |_| Ok(())),
            Err(RuntimeError::InvalidHandle {
                handle: Handle::NULL,
                reason: HandleFault::Null
            })
        );
        assert!(table.release(Handle::NULL).is_err());
    }

    #[test]
    fn test_released_handle_rejected() {
        let table = HandleTable::new();
        let handle = table.insert(string(b"gone"));
        table.release(handle).unwrap();

        assert_eq!(
            table.with(handle, |_| Ok(())),
            Err(RuntimeError::InvalidHandle {
                handle,
                reason: HandleFault::Unknown
            })
        );
        // Double release is reported too.
        assert!(table.release(handle).is_err());
    }

    #[test]
    fn test_with_mut_updates_object() {
        let table = HandleTable::new();
        let handle = table.insert(int_buffer(0));

        table
            .with_mut(handle, |object| match object {
                Object::Buffer(buffer) => i32::unwrap_mut(buffer).unwrap().push(9),
                other => Err(kind_mismatch(handle, ObjectKind::Buffer(ElementKind::Int), other.kind())),
            })
            .unwrap();

        let length = table
            .with(handle, |object| match object {
                Object::Buffer(buffer) => Ok(buffer.len()),
                other => Err(kind_mismatch(handle, ObjectKind::AnyBuffer, other.kind())),
            })
            .unwrap();
        assert_eq!(length, 1);
    }

    #[test]
    fn test_stats_track_peak() {
        let table = HandleTable::new();
        let a = table.insert(int_buffer(1));
        let b = table.insert(int_buffer(1));
        table.release(a).unwrap();
        let _c = table.insert(string(b"c"));
        table.release(b).unwrap();

        let stats = table.stats();
        assert_eq!(stats.allocated, 3);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.peak, 2);
        assert_eq!(stats.live(), 1);
    }

    #[test]
    fn test_live_never_underflows() {
        // A snapshot can observe a release before the matching allocation.
        let stats = HandleStats {
            allocated: 1,
            released: 2,
            peak: 1,
        };
        assert_eq!(stats.live(), 0);
    }

    #[test]
    fn test_clear_all() {
        let table = HandleTable::new();
        let a = table.insert(int_buffer(1));
        let b = table.insert(string(b"b"));
        table.clear_all();

        assert!(table.is_empty());
        assert!(!table.is_valid(a));
        assert!(!table.is_valid(b));
        assert_eq!(table.stats().live(), 0);
    }
}
