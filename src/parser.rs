//! PDF object parser.
//!
//! Recursive descent over lexer tokens: primitives, arrays, dictionaries,
//! streams, indirect references and `N G obj ... endobj` wrappers.

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Dict, Object, ObjectRef};
use nom::IResult;

/// Decode escape sequences in a literal string body.
///
/// Handles `\n \r \t \b \f \( \) \\`, 1-3 digit octal escapes and
/// backslash line continuations. Unknown escapes drop the backslash.
///
/// ```
/// # use pdf_certifier::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"Section \\247 1"), b"Section \xa7 1");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            result.push(raw[i]);
            i += 1;
            continue;
        }

        let escaped = raw[i + 1];
        i += 2;
        match escaped {
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'b' => result.push(8),
            b'f' => result.push(12),
            b'(' | b')' | b'\\' => result.push(escaped),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut octal = (escaped - b'0') as u32;
                for _ in 0..2 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            octal = octal * 8 + (d - b'0') as u32;
                            i += 1;
                        },
                        _ => break,
                    }
                }
                result.push((octal & 0xFF) as u8);
            },
            other => result.push(other),
        }
    }

    result
}

fn fail(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
}

/// Parse a PDF object from input bytes.
///
/// ```
/// use pdf_certifier::parser::parse_object;
///
/// let (_, obj) = parse_object(b"[ 1 2 /Name 3 0 R ]").unwrap();
/// assert_eq!(obj.as_array().map(|a| a.len()), Some(4));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, tok) = token(input)?;

    match tok {
        Token::Null => Ok((input, Object::Null)),
        Token::True => Ok((input, Object::Boolean(true))),
        Token::False => Ok((input, Object::Boolean(false))),

        Token::Integer(i) => {
            // "id gen R" lookahead
            if let Ok((after_gen, Token::Integer(gen))) = token(input) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if i >= 0 && (0..=u16::MAX as i64).contains(&gen) {
                        return Ok((after_r, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                    }
                }
            }
            Ok((input, Object::Integer(i)))
        },

        Token::Real(r) => Ok((input, Object::Real(r))),

        Token::LiteralString(bytes) => Ok((input, Object::String(decode_literal_string_escapes(bytes)))),

        Token::HexString(hex) => match decode_hex(hex) {
            Ok(decoded) => Ok((input, Object::String(decoded))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Fail,
            ))),
        },

        Token::Name(name) => Ok((input, Object::Name(name))),

        Token::ArrayStart => parse_array(input),

        Token::DictStart => {
            let (remaining, dict) = parse_dictionary(input)?;
            if let Ok((stream_input, Token::StreamStart)) = token(remaining) {
                let (rest, data) = parse_stream_data(stream_input, &dict)?;
                return Ok((
                    rest,
                    Object::Stream {
                        dict,
                        data: bytes::Bytes::from(data),
                    },
                ));
            }
            Ok((remaining, Object::Dictionary(dict)))
        },

        _ => Err(fail(input)),
    }
}

/// Read stream bytes following the `stream` keyword.
///
/// A direct `/Length` is trusted when `endstream` follows it; otherwise the
/// data runs to the next `endstream` keyword (minus its EOL marker).
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dict) -> IResult<&'a [u8], Vec<u8>> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        input
    };

    if let Some(length) = dict.get("Length").and_then(|o| o.as_integer()) {
        let length = length as usize;
        if length <= input.len() {
            if let Ok((rest, Token::StreamEnd)) = token(&input[length..]) {
                return Ok((rest, input[..length].to_vec()));
            }
        }
        log::debug!("Stream /Length {} does not reach endstream, scanning", length);
    }

    let pos = find_endstream(input).ok_or_else(|| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof))
    })?;
    let mut end = pos;
    if end > 0 && input[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && input[end - 1] == b'\r' {
        end -= 1;
    }
    let (rest, _) = token(&input[pos..])?;
    Ok((rest, input[..end].to_vec()))
}

fn find_endstream(input: &[u8]) -> Option<usize> {
    let keyword = b"endstream";
    input.windows(keyword.len()).position(|window| window == keyword)
}

fn parse_array(input: &[u8]) -> IResult<&[u8], Object> {
    let mut objects = Vec::new();
    let mut remaining = input;

    loop {
        let (after, tok) = token(remaining)?;
        if tok == Token::ArrayEnd {
            return Ok((after, Object::Array(objects)));
        }
        let (after, obj) = parse_object(remaining)?;
        objects.push(obj);
        remaining = after;
    }
}

fn parse_dictionary(input: &[u8]) -> IResult<&[u8], Dict> {
    let mut dict = Dict::new();
    let mut remaining = input;

    loop {
        let (after, tok) = token(remaining)?;
        match tok {
            Token::DictEnd => return Ok((after, dict)),
            Token::Name(key) => {
                let (after, value) = parse_object(after)?;
                dict.insert(key, value);
                remaining = after;
            },
            _ => return Err(fail(remaining)),
        }
    }
}

/// Decode a hex string body to bytes; whitespace is ignored and an odd
/// trailing digit is padded with 0.
///
/// ```
/// use pdf_certifier::parser::decode_hex;
/// assert_eq!(decode_hex(b"48656C6C6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"7").unwrap(), vec![0x70]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes
        .iter()
        .copied()
        .filter(|c| !c.is_ascii_whitespace() && *c != 0)
        .collect();

    let nibble = |c: u8| -> Result<u8> {
        (c as char)
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or_else(|| Error::Decode(format!("invalid hex digit {:?}", c as char)))
    };

    digits
        .chunks(2)
        .map(|pair| {
            let hi = nibble(pair[0])?;
            let lo = match pair.get(1) {
                Some(&c) => nibble(c)?,
                None => 0,
            };
            Ok((hi << 4) | lo)
        })
        .collect()
}

/// Parse an indirect object `N G obj <object> endobj` at the start of `input`.
///
/// Returns the reference, the object and the unconsumed input.
pub fn parse_indirect_object(input: &[u8]) -> Result<(ObjectRef, Object, &[u8])> {
    let err = |reason: &str| Error::ParseError {
        offset: 0,
        reason: reason.to_string(),
    };

    let (rest, id) = match token(input) {
        Ok((rest, Token::Integer(id))) if id >= 0 => (rest, id as u32),
        _ => return Err(err("expected object number")),
    };
    let (rest, gen) = match token(rest) {
        Ok((rest, Token::Integer(gen))) if (0..=u16::MAX as i64).contains(&gen) => (rest, gen as u16),
        _ => return Err(err("expected generation number")),
    };
    let rest = match token(rest) {
        Ok((rest, Token::ObjStart)) => rest,
        _ => return Err(err("expected 'obj' keyword")),
    };
    let (rest, object) = parse_object(rest).map_err(|e| Error::ParseError {
        offset: 0,
        reason: format!("object {} {}: {}", id, gen, e),
    })?;

    // A missing endobj is tolerated
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => skip_ws(after),
        _ => skip_ws(rest),
    };

    Ok((ObjectRef::new(id, gen), object, rest))
}
