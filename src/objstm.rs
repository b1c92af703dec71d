//! Object stream parsing (PDF 1.5+).
//!
//! An `/Type /ObjStm` stream starts with `/N` pairs of integers
//! (object number, offset relative to `/First`) followed by the objects
//! themselves, without `obj`/`endobj` wrappers.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::Object;
use crate::parser::parse_object;
use std::collections::HashMap;

/// Parse an object stream into a map of object number to object.
///
/// Objects that fail to parse are skipped with a warning; the remaining
/// ones are still returned.
pub fn parse_object_stream(stream_obj: &Object) -> Result<HashMap<u32, Object>> {
    let dict = match stream_obj {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };

    if dict.get("Type").and_then(|o| o.as_name()) != Some("ObjStm") {
        return Err(Error::InvalidPdf("object stream lacks /Type /ObjStm".to_string()));
    }
    let count = dict
        .get("N")
        .and_then(|o| o.as_integer())
        .filter(|n| *n >= 0)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /N".to_string()))? as usize;
    let first = dict
        .get("First")
        .and_then(|o| o.as_integer())
        .filter(|n| *n >= 0)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /First".to_string()))? as usize;

    let decoded = stream_obj.decode_stream_data()?;
    if first > decoded.len() {
        return Err(Error::InvalidPdf(format!(
            "object stream /First {} beyond data length {}",
            first,
            decoded.len()
        )));
    }

    let pairs = parse_pairs(&decoded[..first], count)?;
    let body = &decoded[first..];
    let mut objects = HashMap::with_capacity(pairs.len());

    for (id, offset) in pairs {
        let Some(slice) = body.get(offset..) else {
            log::warn!("Object {} offset {} beyond object stream data", id, offset);
            continue;
        };
        match parse_object(slice) {
            Ok((_, obj)) => {
                objects.insert(id, obj);
            },
            Err(e) => log::warn!("Failed to parse object {} from object stream: {:?}", id, e),
        }
    }

    Ok(objects)
}

fn parse_pairs(header: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count.min(4096));
    let mut remaining = header;

    for i in 0..count {
        let mut next_int = |what: &str| -> Result<i64> {
            match token(remaining) {
                Ok((rest, Token::Integer(n))) if n >= 0 => {
                    remaining = rest;
                    Ok(n)
                },
                _ => Err(Error::ParseError {
                    offset: header.len() - remaining.len(),
                    reason: format!("failed to read {} of object stream pair {}", what, i),
                }),
            }
        };
        let id = next_int("object number")? as u32;
        let offset = next_int("offset")? as usize;
        pairs.push((id, offset));
    }

    Ok(pairs)
}
