//! Textual output of runtime values
//!
//! Formats follow the host `printf` conventions compiled programs were
//! written against: integers in decimal, `float`/`double` in fixed notation
//! with six fractional digits, booleans as `true`/`false`, characters as a
//! single byte, and strings as their `length` bytes.

use std::io::{self, Write};

use crate::string::ByteString;

/// A value with a printed form
pub trait Printable {
    fn print_to(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl Printable for i32 {
    fn print_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(itoa::Buffer::new().format(*self).as_bytes())
    }
}

impl Printable for i64 {
    fn print_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(itoa::Buffer::new().format(*self).as_bytes())
    }
}

impl Printable for f64 {
    fn print_to(&self, out: &mut dyn Write) -> io::Result<()> {
        write_fixed(out, *self)
    }
}

impl Printable for f32 {
    fn print_to(&self, out: &mut dyn Write) -> io::Result<()> {
        write_fixed(out, f64::from(*self))
    }
}

impl Printable for bool {
    fn print_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(if *self { b"true" } else { b"false" })
    }
}

/// Characters are single bytes.
impl Printable for u8 {
    fn print_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&[*self])
    }
}

impl Printable for ByteString {
    fn print_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self.as_bytes())
    }
}

fn write_fixed(out: &mut dyn Write, value: f64) -> io::Result<()> {
    if value.is_nan() {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        write!(out, "{sign}nan")
    } else if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        write!(out, "{sign}inf")
    } else {
        write!(out, "{value:.6}")
    }
}

/// Writes printed values to a sink
pub struct Printer<W> {
    out: W,
}

impl Printer<io::StdoutLock<'static>> {
    pub fn stdout() -> Self {
        Printer::new(io::stdout().lock())
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn print(&mut self, value: &dyn Printable) -> io::Result<()> {
        value.print_to(&mut self.out)
    }

    pub fn println(&mut self, value: &dyn Printable) -> io::Result<()> {
        value.print_to(&mut self.out)?;
        self.endline()
    }

    pub fn endline(&mut self) -> io::Result<()> {
        self.out.write_all(b"\n")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printed(f: impl FnOnce(&mut Printer<Vec<u8>>) -> io::Result<()>) -> String {
        let mut printer = Printer::new(Vec::new());
        f(&mut printer).unwrap();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn test_print_integers() {
        assert_eq!(printed(|p| p.print(&-17i32)), "-17");
        assert_eq!(printed(|p| p.println(&9_000_000_000i64)), "9000000000\n");
    }

    #[test]
    fn test_print_floats_fixed() {
        assert_eq!(printed(|p| p.print(&3.5f64)), "3.500000");
        assert_eq!(printed(|p| p.print(&0.1f32)), "0.100000");
        assert_eq!(printed(|p| p.print(&-2.0f64)), "-2.000000");
        assert_eq!(printed(|p| p.print(&f64::INFINITY)), "inf");
        assert_eq!(printed(|p| p.print(&f64::NEG_INFINITY)), "-inf");
        assert_eq!(printed(|p| p.print(&f64::NAN)), "nan");
    }

    #[test]
    fn test_print_bool_and_char() {
        assert_eq!(printed(|p| p.print(&true)), "true");
        assert_eq!(printed(|p| p.println(&false)), "false\n");
        assert_eq!(printed(|p| p.println(&b'z')), "z\n");
    }

    #[test]
    fn test_print_string_uses_length() {
        let s = ByteString::from_bytes(b"hi there").unwrap();
        assert_eq!(printed(|p| p.println(&s)), "hi there\n");
    }

    #[test]
    fn test_endline() {
        assert_eq!(
            printed(|p| {
                p.print(&1i32)?;
                p.endline()?;
                p.print(&2i32)
            }),
            "1\n2"
        );
    }
}
