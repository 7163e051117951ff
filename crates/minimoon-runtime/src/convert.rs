//! Numeric to string conversion and numeric coercions

use crate::string::ByteString;

/// Types with a canonical textual form
pub trait ToByteString {
    fn to_byte_string(&self) -> ByteString;
}

macro_rules! impl_integer_to_string {
    ($($ty:ty),*) => {
        $(
            impl ToByteString for $ty {
                fn to_byte_string(&self) -> ByteString {
                    let mut buf = itoa::Buffer::new();
                    ByteString::from_short(buf.format(*self).as_bytes())
                }
            }
        )*
    };
}

impl_integer_to_string!(i32, i64);

/// Shortest round-trippable form; integral values drop the `.0` suffix.
fn format_shortest<F>(value: F) -> ByteString
where
    F: ryu::Float + Into<f64>,
{
    let wide: f64 = value.into();
    let mut buf = ryu::Buffer::new();
    let text: &str = if wide.is_nan() {
        "nan"
    } else if wide == f64::INFINITY {
        "inf"
    } else if wide == f64::NEG_INFINITY {
        "-inf"
    } else {
        buf.format_finite(value)
    };
    let text = text.strip_suffix(".0").unwrap_or(text);
    ByteString::from_short(text.as_bytes())
}

impl ToByteString for f64 {
    fn to_byte_string(&self) -> ByteString {
        format_shortest(*self)
    }
}

impl ToByteString for f32 {
    fn to_byte_string(&self) -> ByteString {
        format_shortest(*self)
    }
}

/// A character converts to the one-byte string holding it.
impl ToByteString for u8 {
    fn to_byte_string(&self) -> ByteString {
        ByteString::from_short(&[*self])
    }
}

/// Truncate toward zero. NaN maps to 0 and out-of-range values saturate.
pub fn int_of_float(value: f64) -> i32 {
    value as i32
}

/// Same conversion as [`int_of_float`], exposed under the name the compiler
/// uses for explicit truncation.
pub fn truncate(value: f64) -> i32 {
    int_of_float(value)
}

pub fn float_of_int(value: i32) -> f64 {
    f64::from(value)
}

/// Negates values below zero; `-0.0` and NaN pass through unchanged.
pub fn abs_float(value: f64) -> f64 {
    if value < 0.0 { -value } else { value }
}
