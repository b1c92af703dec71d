//! PDF object serialization.
//!
//! Dictionary keys are written in insertion order, so output is
//! deterministic for a given construction sequence.

use crate::object::{Dict, Object, ObjectRef};

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
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging and tests).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> Vec<u8> {
        let mut buf = format!("{} {} obj\n", id, gen).into_bytes();
        self.write_object(&mut buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    fn write_object(&self, w: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => w.extend_from_slice(b"null"),
            Object::Boolean(b) => w.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => w.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => w.extend_from_slice(format_real(*r).as_bytes()),
            Object::String(s) => write_string(w, s),
            Object::Name(n) => write_name(w, n),
            Object::Array(arr) => {
                w.push(b'[');
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        w.push(b' ');
                    }
                    self.write_object(w, item);
                }
                w.push(b']');
            },
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => {
                let mut dict = dict.clone();
                dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
                self.write_dictionary(w, &dict);
                w.extend_from_slice(b"\nstream\n");
                w.extend_from_slice(data);
                w.extend_from_slice(b"\nendstream");
            },
            Object::Reference(r) => w.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes()),
        }
    }

    fn write_dictionary(&self, w: &mut Vec<u8>, dict: &Dict) {
        w.extend_from_slice(b"<<");
        for (key, value) in dict {
            w.extend_from_slice(if self.compact { b" " } else { b"\n  " });
            write_name(w, key);
            w.push(b' ');
            self.write_object(w, value);
        }
        w.extend_from_slice(if self.compact || dict.is_empty() { b" >>" } else { b"\n>>" });
    }
}

/// Format a real with at most five decimals and no trailing zeros.
pub fn format_real(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let formatted = format!("{:.5}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Literal syntax for printable ASCII, hex syntax otherwise.
fn write_string(w: &mut Vec<u8>, data: &[u8]) {
    let printable = data
        .iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

    if printable {
        w.push(b'(');
        for &byte in data {
            match byte {
                b'(' | b')' | b'\\' => w.extend_from_slice(&[b'\\', byte]),
                b'\n' => w.extend_from_slice(b"\\n"),
                b'\r' => w.extend_from_slice(b"\\r"),
                b'\t' => w.extend_from_slice(b"\\t"),
                _ => w.push(byte),
            }
        }
        w.push(b')');
    } else {
        w.push(b'<');
        for byte in data {
            w.extend_from_slice(format!("{:02X}", byte).as_bytes());
        }
        w.push(b'>');
    }
}

/// Names escape whitespace, delimiters, `#` and non-ASCII as `#xx`.
fn write_name(w: &mut Vec<u8>, name: &str) {
    w.push(b'/');
    for byte in name.bytes() {
        let regular = (0x21..=0x7E).contains(&byte)
            && !matches!(byte, b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}');
        if regular {
            w.push(byte);
        } else {
            w.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
}

/// Helper functions for building PDF objects.
impl ObjectSerializer {
    /// Create a Name object.
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Create a String object from a Rust string.
    pub fn string(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec())
    }

    /// Text string: ASCII as is, anything else as UTF-16BE with a byte
    /// order mark.
    pub fn text_string(s: &str) -> Object {
        if s.is_ascii() {
            return Self::string(s);
        }
        let mut bytes = vec![0xFE, 0xFF];
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes)
    }

    /// Create a Dictionary object.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(Self::dict_map(entries))
    }

    /// Create a bare dictionary map, keeping entry order.
    pub fn dict_map(entries: Vec<(&str, Object)>) -> Dict {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    /// Create a Reference object.
    pub fn reference(r: ObjectRef) -> Object {
        Object::Reference(r)
    }

    /// Rectangle array `[llx lly urx ury]`.
    pub fn rect(llx: f64, lly: f64, urx: f64, ury: f64) -> Object {
        Object::Array(vec![Object::Real(llx), Object::Real(lly), Object::Real(urx), Object::Real(ury)])
    }
}
