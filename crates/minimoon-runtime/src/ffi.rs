//! C ABI for compiled programs
//!
//! Symbol names match what the code generator emits calls to. Every function
//! forwards to [`Runtime::global`]. A call that violates a precondition
//! (bad index, wrong or released handle, negative length, allocation failure)
//! never returns: the error is reported on stderr and the process aborts.
//!
//! Handles cross the boundary as 64-bit opaque values.

use std::ffi::{CStr, c_char, c_int};
use std::io::{self, Write};

use tracing::{error, warn};

use crate::convert;
use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::Handle;
use crate::output::{Printable, Printer};
use crate::runtime::Runtime;

/// Report a failed primitive and abort the process.
#[cold]
fn fail(err: RuntimeError) -> ! {
    error!(%err, "runtime primitive failed");
    let _ = io::stdout().flush();
    eprintln!("minimoon runtime error: {err}");
    std::process::abort()
}

fn check<T>(result: RuntimeResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => fail(err),
    }
}

// =============================================================================
// Arrays
// =============================================================================

macro_rules! array_primitives {
    (
        $elem:ty, $abi:ty,
        into: $into:expr, from: $from:expr,
        $make:ident, $push:ident, $get:ident, $put:ident
    ) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $make(length: i32, fill: $abi) -> Handle {
            let fill: $elem = $into(fill);
            check(Runtime::global().make_array(length, fill))
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn $push(array: Handle, value: $abi) {
            let value: $elem = $into(value);
            check(Runtime::global().array_push(array, value))
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn $get(array: Handle, index: i32) -> $abi {
            let value: $elem = check(Runtime::global().array_get(array, index));
            $from(value)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn $put(array: Handle, index: i32, value: $abi) {
            let value: $elem = $into(value);
            check(Runtime::global().array_put(array, index, value))
        }
    };
}

fn same<T>(value: T) -> T {
    value
}

array_primitives!(
    i32, i32, into: same, from: same,
    make_int_array, array_int_push, array_int_get, array_int_put
);
array_primitives!(
    i64, i64, into: same, from: same,
    make_int64_array, array_int64_push, array_int64_get, array_int64_put
);
array_primitives!(
    f64, f64, into: same, from: same,
    make_double_array, array_double_push, array_double_get, array_double_put
);
array_primitives!(
    f32, f32, into: same, from: same,
    make_float_array, array_float_push, array_float_get, array_float_put
);
array_primitives!(
    bool, u8, into: |v: u8| v != 0, from: u8::from,
    make_bool_array, array_bool_push, array_bool_get, array_bool_put
);
array_primitives!(
    u8, u8, into: same, from: same,
    make_char_array, array_char_push, array_char_get, array_char_put
);
array_primitives!(
    Handle, Handle, into: same, from: same,
    make_ptr_array, array_ptr_push, array_ptr_get, array_ptr_put
);

/// Length of an array of any element kind
#[unsafe(no_mangle)]
pub extern "C" fn get_array_length(array: Handle) -> i32 {
    check(Runtime::global().array_length(array))
}

// =============================================================================
// Strings
// =============================================================================

/// Create a string from a NUL-terminated literal
///
/// # Safety
/// `text` must be null or point to a NUL-terminated byte sequence.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __builtin_create_string(text: *const c_char) -> Handle {
    if text.is_null() {
        fail(RuntimeError::NullPointer {
            argument: "string literal",
        });
    }
    let text = unsafe { CStr::from_ptr(text) };
    check(Runtime::global().create_string(text.to_bytes()))
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_get_string_length(string: Handle) -> i32 {
    check(Runtime::global().string_length(string))
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_string_concat(left: Handle, right: Handle) -> Handle {
    check(Runtime::global().string_concat(left, right))
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_get_char_in_string(string: Handle, index: i32) -> u8 {
    check(Runtime::global().char_at(string, index))
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_int_to_string(value: i32) -> Handle {
    Runtime::global().to_string(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_int64_to_string(value: i64) -> Handle {
    Runtime::global().to_string(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_float_to_string(value: f32) -> Handle {
    Runtime::global().to_string(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_double_to_string(value: f64) -> Handle {
    Runtime::global().to_string(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_char_to_string(value: u8) -> Handle {
    Runtime::global().to_string(value)
}

// =============================================================================
// Numeric coercions
// =============================================================================

#[unsafe(no_mangle)]
pub extern "C" fn int_of_float(value: f64) -> i32 {
    convert::int_of_float(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn float_of_int(value: i32) -> f64 {
    convert::float_of_int(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn truncate(value: f64) -> i32 {
    convert::truncate(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn abs_float(value: f64) -> f64 {
    convert::abs_float(value)
}

// =============================================================================
// Output
// =============================================================================

fn emit(value: &dyn Printable, newline: bool) {
    let mut printer = Printer::stdout();
    // Stdout is line buffered and nothing flushes it when a host C `main`
    // returns, so a partial line is pushed out immediately.
    let result = if newline {
        printer.println(value)
    } else {
        printer.print(value).and_then(|()| printer.flush())
    };
    report_write(result)
}

fn emit_endline() {
    report_write(Printer::stdout().endline())
}

fn report_write(result: io::Result<()>) {
    if let Err(err) = result {
        warn!(%err, "failed to write to stdout");
    }
}

/// Print the string behind `string`; the null handle prints nothing.
fn emit_string(string: Handle, newline: bool) {
    if string.is_null() {
        if newline {
            emit_endline();
        }
        return;
    }
    let string = check(Runtime::global().string(string));
    emit(&*string, newline)
}

macro_rules! print_primitives {
    ($($ty:ty => $print:ident, $println:ident;)*) => {
        $(
            #[unsafe(no_mangle)]
            pub extern "C" fn $print(value: $ty) {
                emit(&value, false)
            }

            #[unsafe(no_mangle)]
            pub extern "C" fn $println(value: $ty) {
                emit(&value, true)
            }
        )*
    };
}

print_primitives! {
    i32 => __builtin_print_int, __builtin_println_int;
    i64 => __builtin_print_int64, __builtin_println_int64;
    f32 => __builtin_print_float, __builtin_println_float;
    f64 => __builtin_print_double, __builtin_println_double;
    u8 => __builtin_print_char, __builtin_println_char;
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_print_bool(value: u8) {
    emit(&(value != 0), false)
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_println_bool(value: u8) {
    emit(&(value != 0), true)
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_print_string(string: Handle) {
    emit_string(string, false)
}

#[unsafe(no_mangle)]
pub extern "C" fn __builtin_println_string(string: Handle) {
    emit_string(string, true)
}

#[unsafe(no_mangle)]
pub extern "C" fn print_int(value: i32) {
    __builtin_print_int(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn print_bool(value: u8) {
    __builtin_print_bool(value)
}

#[unsafe(no_mangle)]
pub extern "C" fn print_string(string: Handle) {
    __builtin_print_string(string)
}

#[unsafe(no_mangle)]
pub extern "C" fn print_endline() {
    emit_endline()
}

// =============================================================================
// Raw memory and handle lifetime
// =============================================================================

const RAW_ALIGN: usize = 8;

/// Allocate `size` bytes for a compiler-managed aggregate
///
/// Returns null when `size` is not positive or the allocation fails.
///
/// # Safety
/// Caller must eventually free the returned pointer via `moonbit_free`
/// with the same `size`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn moonbit_malloc(size: i32) -> *mut u8 {
    let Ok(size) = usize::try_from(size) else {
        return std::ptr::null_mut();
    };
    if size == 0 {
        return std::ptr::null_mut();
    }
    let Ok(layout) = std::alloc::Layout::from_size_align(size, RAW_ALIGN) else {
        return std::ptr::null_mut();
    };
    unsafe { std::alloc::alloc(layout) }
}

/// # Safety
/// `ptr` must have been allocated by `moonbit_malloc` with the same `size`,
/// or be null (in which case this is a no-op).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn moonbit_free(ptr: *mut u8, size: i32) {
    if ptr.is_null() {
        return;
    }
    let Ok(size) = usize::try_from(size) else {
        return;
    };
    if size == 0 {
        return;
    }
    let Ok(layout) = std::alloc::Layout::from_size_align(size, RAW_ALIGN) else {
        return;
    };
    unsafe { std::alloc::dealloc(ptr, layout) };
}

/// Release an array or string. Releasing the null handle is a no-op.
#[unsafe(no_mangle)]
pub extern "C" fn minimoon_release(handle: Handle) {
    if handle.is_null() {
        return;
    }
    check(Runtime::global().release(handle))
}

/// Read handle statistics of the global runtime
///
/// # Safety
/// Each non-null pointer must be valid for a `u64` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minimoon_handle_stats(
    allocated: *mut u64,
    released: *mut u64,
    peak: *mut u64,
) -> c_int {
    let stats = Runtime::global().stats();
    for (out, value) in [
        (allocated, stats.allocated),
        (released, stats.released),
        (peak, stats.peak),
    ] {
        if !out.is_null() {
            unsafe { *out = value };
        }
    }
    0
}
