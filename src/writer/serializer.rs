//! PDF object serialization.
//!
//! Serializes PDF objects to their byte representation according to
//! PDF specification ISO 32000-1:2008. The linearized writer always uses
//! the compact variant: minimal whitespace and insertion-ordered dictionary
//! entries, so the same object serializes to the same bytes on every pass.

use std::io::Write;

use crate::object::{Dict, Object};

/// Serializer for PDF objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj).unwrap();
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).to_string()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        writeln!(buf, "{} {} obj", id, gen).unwrap();
        self.write_object(&mut buf, obj).unwrap();
        write!(buf, "\nendobj\n").unwrap();
        buf
    }

    /// Write an object to a buffer.
    fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => self.write_real(w, *r),
            Object::String(s) => self.write_string(w, s),
            Object::Name(n) => self.write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => self.write_stream(w, dict, data),
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    /// Write a real number with appropriate precision.
    fn write_real<W: Write>(&self, w: &mut W, value: f64) -> std::io::Result<()> {
        // PDF spec allows up to 5 decimal places for coordinates
        if value.fract() == 0.0 {
            write!(w, "{}", value as i64)
        } else {
            let formatted = format!("{:.5}", value);
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            write!(w, "{}", trimmed)
        }
    }

    /// Write a PDF string.
    ///
    /// Uses literal string syntax `(...)` with proper escaping,
    /// or hex string syntax `<...>` for binary data.
    fn write_string<W: Write>(&self, w: &mut W, data: &[u8]) -> std::io::Result<()> {
        let is_printable = data
            .iter()
            .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

        if is_printable {
            write!(w, "(")?;
            for &byte in data {
                match byte {
                    b'(' => write!(w, "\\(")?,
                    b')' => write!(w, "\\)")?,
                    b'\\' => write!(w, "\\\\")?,
                    b'\n' => write!(w, "\\n")?,
                    b'\r' => write!(w, "\\r")?,
                    b'\t' => write!(w, "\\t")?,
                    _ => w.write_all(&[byte])?,
                }
            }
            write!(w, ")")
        } else {
            write!(w, "<")?;
            for byte in data {
                write!(w, "{:02X}", byte)?;
            }
            write!(w, ">")
        }
    }

    /// Write a PDF name.
    ///
    /// Names start with `/` and escape special characters with `#xx`.
    fn write_name<W: Write>(&self, w: &mut W, name: &str) -> std::io::Result<()> {
        write!(w, "/")?;
        for byte in name.bytes() {
            match byte {
                b'!'
                | b'"'
                | b'$'..=b'&'
                | b'\''..=b'.'
                | b'0'..=b'9'
                | b';'
                | b'<'
                | b'>'
                | b'?'
                | b'@'
                | b'A'..=b'Z'
                | b'^'..=b'z'
                | b'|'
                | b'~' => {
                    w.write_all(&[byte])?;
                },
                _ => {
                    write!(w, "#{:02X}", byte)?;
                },
            }
        }
        Ok(())
    }

    /// Write a PDF array.
    fn write_array<W: Write>(&self, w: &mut W, arr: &[Object]) -> std::io::Result<()> {
        write!(w, "[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                write!(w, " ")?;
            }
            self.write_object(w, obj)?;
        }
        write!(w, "]")
    }

    /// Write a PDF dictionary, entries in insertion order.
    fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dict) -> std::io::Result<()> {
        write!(w, "<<")?;
        for (key, value) in dict {
            if !self.compact {
                write!(w, "\n  ")?;
            }
            self.write_name(w, key)?;
            write!(w, " ")?;
            self.write_object(w, value)?;
        }
        if !self.compact && !dict.is_empty() {
            writeln!(w)?;
        }
        write!(w, ">>")
    }

    /// Write a PDF stream.
    fn write_stream<W: Write>(&self, w: &mut W, dict: &Dict, data: &[u8]) -> std::io::Result<()> {
        // Add Length to dictionary if not present
        let mut dict_with_length = dict.clone();
        if !dict_with_length.contains_key("Length") {
            dict_with_length.insert("Length".to_string(), Object::Integer(data.len() as i64));
        }

        self.write_dictionary(w, &dict_with_length)?;
        write!(w, "\nstream\n")?;
        w.write_all(data)?;
        write!(w, "\nendstream")
    }
}

/// Emit the PDF header: version comment plus binary marker.
///
/// The marker's four high bytes tell transfer agents the file is binary.
pub fn write_header<W: Write>(w: &mut W, version: &str) -> std::io::Result<()> {
    writeln!(w, "%PDF-{}", version)?;
    w.write_all(b"%\x80\x80\x80\x80\n")
}

/// Byte length of the header emitted by [`write_header`].
pub fn header_len(version: &str) -> u64 {
    ("%PDF-".len() + version.len() + 1 + 6) as u64
}

/// Emit the trailing `startxref` / `%%EOF` for a cross-reference section.
pub fn write_eof<W: Write>(w: &mut W, xref_offset: u64) -> std::io::Result<()> {
    write!(w, "startxref\n{}\n%%EOF\n", xref_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;

    #[test]
    fn test_serialize_scalars() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Null), "null");
        assert_eq!(s.serialize_to_string(&Object::Boolean(true)), "true");
        assert_eq!(s.serialize_to_string(&Object::Integer(-123)), "-123");
        assert_eq!(s.serialize_to_string(&Object::Real(1.0)), "1");
        assert_eq!(s.serialize_to_string(&Object::Real(0.5)), "0.5");
    }

    #[test]
    fn test_serialize_string_escaping() {
        let s = ObjectSerializer::new();
        assert_eq!(
            s.serialize_to_string(&Object::String(b"Test (parens)".to_vec())),
            "(Test \\(parens\\))"
        );
    }

    #[test]
    fn test_serialize_hex_string() {
        let s = ObjectSerializer::new();
        // Binary data should use hex string
        assert_eq!(s.serialize_to_string(&Object::String(vec![0x00, 0xFF, 0x80])), "<00FF80>");
    }

    #[test]
    fn test_serialize_name_with_special_chars() {
        let s = ObjectSerializer::new();
        assert_eq!(
            s.serialize_to_string(&Object::Name("Name With Space".to_string())),
            "/Name#20With#20Space"
        );
    }

    #[test]
    fn test_serialize_array() {
        let s = ObjectSerializer::compact();
        let arr = Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)]);
        assert_eq!(s.serialize_to_string(&arr), "[1 2 3]");
    }

    #[test]
    fn test_serialize_dictionary_keeps_insertion_order() {
        let s = ObjectSerializer::compact();
        let dict = Object::dict(vec![
            ("Type", Object::name("Page")),
            ("Count", Object::Integer(1)),
        ]);
        assert_eq!(s.serialize_to_string(&dict), "<</Type /Page/Count 1>>");
    }

    #[test]
    fn test_serialize_reference() {
        let s = ObjectSerializer::new();
        let r = Object::Reference(ObjectRef::new(10, 0));
        assert_eq!(s.serialize_to_string(&r), "10 0 R");
    }

    #[test]
    fn test_serialize_indirect() {
        let s = ObjectSerializer::compact();
        let bytes = s.serialize_indirect(1, 0, &Object::Integer(42));
        assert_eq!(bytes, b"1 0 obj\n42\nendobj\n");
    }

    #[test]
    fn test_serialize_stream() {
        let s = ObjectSerializer::compact();
        let stream = Object::Stream {
            dict: crate::object::Dict::new(),
            data: bytes::Bytes::from_static(b"stream data"),
        };

        let result = s.serialize_to_string(&stream);
        assert_eq!(result, "<</Length 11>>\nstream\nstream data\nendstream");
    }

    #[test]
    fn test_serialize_is_repeatable() {
        let s = ObjectSerializer::compact();
        let obj = Object::dict(vec![
            ("Kids", Object::Array(vec![Object::reference(3, 0)])),
            ("Count", Object::Integer(1)),
        ]);
        assert_eq!(s.serialize(&obj), s.serialize(&obj));
    }

    #[test]
    fn test_write_header_len_matches() {
        let mut buf = Vec::new();
        write_header(&mut buf, "1.4").unwrap();
        assert_eq!(buf.len() as u64, header_len("1.4"));
        assert!(buf.starts_with(b"%PDF-1.4\n"));
        assert_eq!(&buf[9..], b"%\x80\x80\x80\x80\n");
    }

    #[test]
    fn test_write_eof() {
        let mut buf = Vec::new();
        write_eof(&mut buf, 1234).unwrap();
        assert_eq!(buf, b"startxref\n1234\n%%EOF\n");
    }
}
