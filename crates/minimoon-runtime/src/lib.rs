//! MiniMoonBit runtime library.
//!
//! Provides the native primitives that compiled MiniMoonBit programs call for
//! every heap-allocated value:
//! - Growable arrays of `int`, `int64`, `double`, `float`, `bool`, `char`
//!   and opaque pointers ([`buffer`])
//! - Immutable, NUL-terminated byte strings ([`string`])
//! - Number to string conversion and numeric coercions ([`convert`])
//! - `print`/`println` for every printable kind ([`output`])
//!
//! Objects are owned by a [`Runtime`] and referenced through [`Handle`]s.
//! The flat C ABI that generated code links against lives in [`ffi`].

pub mod buffer;
pub mod convert;
pub mod entry;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod output;
pub mod runtime;
pub mod string;

pub use buffer::{AnyBuffer, Element, ElementKind, TypedBuffer};
pub use convert::ToByteString;
pub use entry::{RuntimeConfig, init_logging, run_entry};
pub use error::{RuntimeError, RuntimeResult};
pub use handle::{Handle, HandleFault, HandleStats, HandleTable, Object, ObjectKind};
pub use output::{Printable, Printer};
pub use runtime::Runtime;
pub use string::ByteString;
