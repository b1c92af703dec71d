//! PDF lexer (tokenizer).
//!
//! Splits PDF bytes into tokens: numbers, literal and hex strings, names,
//! keywords and delimiters. Whitespace (space, \t, \r, \n, \0, \f) and
//! comments (% to EOL) between tokens are skipped.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, value},
    sequence::{delimited, preceded},
    IResult,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),
    /// Real number (e.g., 3.14, -2.5, .5)
    Real(f64),
    /// Raw literal string content; escapes are decoded by the parser
    LiteralString(&'a [u8]),
    /// Raw hex string content; may contain whitespace
    HexString(&'a [u8]),
    /// Name with #XX escapes decoded
    Name(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// `obj`
    ObjStart,
    /// `endobj`
    ObjEnd,
    /// `stream`
    StreamStart,
    /// `endstream`
    StreamEnd,
    /// `R` in "10 0 R"
    R,
}

fn is_pdf_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}')
}

fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip all whitespace and comments.
pub fn skip_ws(input: &[u8]) -> &[u8] {
    let mut remaining = input;
    loop {
        let (rest, ws) = match take_while::<_, _, nom::error::Error<&[u8]>>(is_pdf_whitespace)(
            remaining,
        ) {
            Ok(r) => r,
            Err(_) => return remaining,
        };
        remaining = rest;
        if let Ok((rest, _)) = comment(remaining) {
            remaining = rest;
            continue;
        }
        if ws.is_empty() {
            return remaining;
        }
    }
}

fn digit_error(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
}

/// Parse an integer or real number (42, -123, +17, 3.14, .5, 5.).
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let start = input;
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac_part) = opt(preceded(char('.'), opt(digit1)))(input)?;

    // Need digits on at least one side of the point
    if int_part.is_none() && !matches!(frac_part, Some(Some(_))) {
        return Err(digit_error(start));
    }

    let negative = sign == Some('-');
    match frac_part {
        Some(frac) => {
            let int = int_part.unwrap_or(b"0");
            let frac = frac.unwrap_or(b"0");
            let text = format!(
                "{}{}.{}",
                if negative { "-" } else { "" },
                std::str::from_utf8(int).map_err(|_| digit_error(start))?,
                std::str::from_utf8(frac).map_err(|_| digit_error(start))?
            );
            let num: f64 = text.parse().map_err(|_| digit_error(start))?;
            Ok((input, Token::Real(num)))
        },
        None => {
            let digits = int_part.ok_or_else(|| digit_error(start))?;
            let text = std::str::from_utf8(digits).map_err(|_| digit_error(start))?;
            let num: i64 = text.parse().map_err(|_| digit_error(start))?;
            Ok((input, Token::Integer(if negative { -num } else { num })))
        },
    }
}

/// Parse a literal string with balanced parentheses; escapes are kept raw.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (remaining, _) = char('(')(input)?;
    let mut depth = 1;
    let mut pos = 0;

    while depth > 0 && pos < remaining.len() {
        match remaining[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    if depth != 0 || pos > remaining.len() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    Ok((&remaining[pos..], Token::LiteralString(&remaining[..pos - 1])))
}

/// Parse a hexadecimal string such as `<48656C6C6F>`.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    delimited(
        char('<'),
        map(
            take_while(|c: u8| c.is_ascii_hexdigit() || is_pdf_whitespace(c)),
            Token::HexString,
        ),
        char('>'),
    )(input)
}

/// Decode #XX escape sequences in PDF names.
///
/// ```
/// # use pdf_certifier::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes("A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes("A#"), "A#");
/// ```
pub fn decode_name_escapes(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'#' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                result.push(byte);
                i += 3;
                continue;
            }
        }
        result.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&result).into_owned()
}

fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(
            take_while(|c: u8| !is_pdf_whitespace(c) && !is_delimiter(c)),
            |bytes: &[u8]| Token::Name(decode_name_escapes(&String::from_utf8_lossy(bytes))),
        ),
    )(input)
}

/// Keywords must not run into a following regular character ("nullx" is not null).
fn keyword<'a>(
    word: &'static [u8],
    tok: Token<'static>,
) -> impl Fn(&'a [u8]) -> IResult<&'a [u8], Token<'a>> {
    move |input: &'a [u8]| {
        let (rest, _) = tag(word)(input)?;
        if let Some(&next) = rest.first() {
            let alpha_keyword = word[0].is_ascii_alphabetic();
            if alpha_keyword && !is_pdf_whitespace(next) && !is_delimiter(next) {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Tag,
                )));
            }
        }
        Ok((rest, tok.clone()))
    }
}

/// Parse keywords and delimiters. Longer keywords are tried first.
fn parse_keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        keyword(b"false", Token::False),
        keyword(b"true", Token::True),
        keyword(b"null", Token::Null),
        keyword(b"obj", Token::ObjStart),
        keyword(b"endobj", Token::ObjEnd),
        keyword(b"endstream", Token::StreamEnd),
        keyword(b"stream", Token::StreamStart),
        keyword(b"<<", Token::DictStart),
        keyword(b">>", Token::DictEnd),
        keyword(b"[", Token::ArrayStart),
        keyword(b"]", Token::ArrayEnd),
        keyword(b"R", Token::R),
    ))(input)
}

/// Parse a single PDF token after skipping whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    alt((
        parse_keyword,
        parse_name,
        parse_number,
        parse_literal_string,
        parse_hex_string,
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integers() {
        assert_eq!(token(b"42"), Ok((&b""[..], Token::Integer(42))));
        assert_eq!(token(b"-123"), Ok((&b""[..], Token::Integer(-123))));
        assert_eq!(token(b"+17"), Ok((&b""[..], Token::Integer(17))));
    }

    #[test]
    fn test_parse_reals() {
        assert_eq!(token(b"-2.5"), Ok((&b""[..], Token::Real(-2.5))));
        assert_eq!(token(b".5"), Ok((&b""[..], Token::Real(0.5))));
        assert_eq!(token(b"5."), Ok((&b""[..], Token::Real(5.0))));
        assert_eq!(token(b"-.002"), Ok((&b""[..], Token::Real(-0.002))));
    }

    #[test]
    fn test_parse_literal_string_nested_and_escaped() {
        assert_eq!(
            token(b"(Hello (nested) World)"),
            Ok((&b""[..], Token::LiteralString(b"Hello (nested) World")))
        );
        assert_eq!(token(b"(a\\)b)"), Ok((&b""[..], Token::LiteralString(b"a\\)b"))));
    }

    #[test]
    fn test_parse_hex_string_vs_dict_start() {
        assert_eq!(token(b"<48 65>"), Ok((&b""[..], Token::HexString(b"48 65"))));
        assert_eq!(token(b"<< /A 1 >>").map(|(_, t)| t), Ok(Token::DictStart));
    }

    #[test]
    fn test_parse_name_with_escape() {
        assert_eq!(token(b"/A#20B"), Ok((&b""[..], Token::Name("A B".to_string()))));
        assert_eq!(token(b"/Type/Page").map(|(r, t)| (r.len(), t)), Ok((5, Token::Name("Type".into()))));
    }

    #[test]
    fn test_keywords_and_comments() {
        let (rest, t) = token(b"  % comment\n endobj").unwrap();
        assert_eq!(t, Token::ObjEnd);
        assert!(rest.is_empty());
        assert_eq!(token(b"endstream").map(|(_, t)| t), Ok(Token::StreamEnd));
        assert_eq!(token(b"R ").map(|(_, t)| t), Ok(Token::R));
    }

    #[test]
    fn test_keyword_requires_boundary() {
        assert!(matches!(token(b"nullx"), Err(_)));
    }

    #[test]
    fn test_skip_ws_handles_mixed_comments() {
        assert_eq!(skip_ws(b" \r\n%x\n%y\r\t42"), b"42");
    }
}
