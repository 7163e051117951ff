//! Immutable byte strings
//!
//! A [`ByteString`] stores its length explicitly and additionally keeps a
//! trailing NUL byte so the contents can be handed to C-style text sinks.
//! The terminator is never counted in the length, and length-based
//! operations never scan for it.

use std::ffi::CStr;
use std::fmt;

use crate::error::{RuntimeError, RuntimeResult};

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ByteString {
    /// Content followed by a single NUL byte.
    bytes: Box<[u8]>,
    length: i32,
}

impl ByteString {
    /// Build a string from literal text.
    ///
    /// The text ends at the first NUL byte, if any, just like a C literal.
    pub fn from_bytes(text: &[u8]) -> RuntimeResult<Self> {
        let content = until_nul(text);
        let length = i32::try_from(content.len())
            .map_err(|_| RuntimeError::out_of_memory(content.len()))?;
        Self::assemble(length, &[content])
    }

    pub fn from_c_str(text: &CStr) -> RuntimeResult<Self> {
        Self::from_bytes(text.to_bytes())
    }

    /// Build a short string that is known to fit, such as a formatted number.
    pub(crate) fn from_short(text: &[u8]) -> Self {
        let content = until_nul(text);
        let mut bytes = Vec::with_capacity(content.len() + 1);
        bytes.extend_from_slice(content);
        bytes.push(0);
        Self {
            bytes: bytes.into_boxed_slice(),
            length: content.len() as i32,
        }
    }

    /// Concatenate two strings into a new one; neither input is modified.
    pub fn concat(left: &ByteString, right: &ByteString) -> RuntimeResult<Self> {
        let length = left.length.checked_add(right.length).ok_or_else(|| {
            RuntimeError::out_of_memory(left.length as usize + right.length as usize)
        })?;
        Self::assemble(length, &[left.as_bytes(), right.as_bytes()])
    }

    fn assemble(length: i32, parts: &[&[u8]]) -> RuntimeResult<Self> {
        let size = length as usize + 1;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| RuntimeError::out_of_memory(size))?;
        for part in parts {
            bytes.extend_from_slice(part);
        }
        bytes.push(0);

        Ok(Self {
            bytes: bytes.into_boxed_slice(),
            length,
        })
    }

    pub fn len(&self) -> i32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Byte at `index`
    pub fn char_at(&self, index: i32) -> RuntimeResult<u8> {
        if index < 0 || index >= self.length {
            return Err(RuntimeError::index_out_of_range(index, self.length));
        }
        Ok(self.bytes[index as usize])
    }

    /// Content without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.length as usize]
    }

    /// Content including the terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_c_str(&self) -> &CStr {
        // Content never contains a NUL, so this always spans the whole string.
        CStr::from_bytes_until_nul(&self.bytes).unwrap_or(c"")
    }
}

impl fmt::Debug for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.as_bytes().escape_ascii())
    }
}

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

fn until_nul(text: &[u8]) -> &[u8] {
    match text.iter().position(|&b| b == 0) {
        Some(end) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_construction() {
        let s = ByteString::from_bytes(b"hello").unwrap();
        assert_eq!(s.len(), 5);
        assert_eq!(s.as_bytes(), b"hello");
        assert_eq!(s.as_bytes_with_nul(), b"hello\0");
        assert_eq!(s.as_c_str(), c"hello");
    }

    #[test]
    fn test_literal_stops_at_nul() {
        let s = ByteString::from_bytes(b"abc\0def").unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.as_bytes(), b"abc");
    }

    #[test]
    fn test_empty_string() {
        let s = ByteString::from_bytes(b"").unwrap();
        assert!(s.is_empty());
        assert_eq!(s.as_bytes_with_nul(), b"\0");
        assert!(s.char_at(0).is_err());
    }

    #[test]
    fn test_concat_leaves_inputs_intact() {
        let foo = ByteString::from_bytes(b"foo").unwrap();
        let bar = ByteString::from_bytes(b"bar").unwrap();
        let joined = ByteString::concat(&foo, &bar).unwrap();

        assert_eq!(joined.len(), 6);
        let chars: Vec<u8> = (0..6).map(|i| joined.char_at(i).unwrap()).collect();
        assert_eq!(chars, b"foobar");
        assert_eq!(joined.as_bytes_with_nul(), b"foobar\0");

        assert_eq!(foo.as_bytes(), b"foo");
        assert_eq!(bar.as_bytes(), b"bar");
    }

    #[test]
    fn test_char_at_bounds() {
        let s = ByteString::from_c_str(c"xy").unwrap();
        assert_eq!(s.char_at(1).unwrap(), b'y');
        assert_eq!(
            s.char_at(2),
            Err(RuntimeError::IndexOutOfRange {
                index: 2,
                length: 2
            })
        );
        assert!(s.char_at(-1).is_err());
    }

    #[test]
    fn test_debug_escapes_bytes() {
        let s = ByteString::from_short(b"a\n\xff");
        assert_eq!(format!("{s:?}"), "\"a\\n\\xff\"");
    }
}
