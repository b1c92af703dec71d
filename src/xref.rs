//! Cross-reference table parsing.
//!
//! Handles classic `xref` tables, PDF 1.5 cross-reference streams, hybrid
//! files (`/XRefStm` in a classic trailer) and `/Prev` chains left by
//! earlier incremental updates.

use crate::error::{Error, Result};
use crate::lexer::skip_ws;
use crate::object::{Dict, Object};
use crate::parser::{parse_indirect_object, parse_object};
use std::collections::HashMap;

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free slot
    Free,
    /// Uncompressed object at a byte offset
    InUse {
        /// Byte offset of `N G obj`
        offset: u64,
        /// Generation number
        generation: u16,
    },
    /// Object `index` inside object stream `stream_id`
    Compressed {
        /// Object number of the containing object stream
        stream_id: u32,
        /// Index within the stream
        index: u32,
    },
}

/// Which syntax the newest cross-reference section uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefKind {
    /// `xref` keyword table followed by `trailer`
    Table,
    /// `/Type /XRef` stream
    Stream,
}

/// Merged view of every cross-reference section in the file.
#[derive(Debug, Clone)]
pub struct CrossRefTable {
    entries: HashMap<u32, XRefEntry>,
    trailer: Dict,
    kind: XRefKind,
    startxref: u64,
}

impl CrossRefTable {
    /// Look up an object number.
    pub fn get(&self, id: u32) -> Option<&XRefEntry> {
        self.entries.get(&id)
    }

    /// Trailer of the newest section.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Syntax of the newest section.
    pub fn kind(&self) -> XRefKind {
        self.kind
    }

    /// Offset recorded after the final `startxref`.
    pub fn startxref(&self) -> u64 {
        self.startxref
    }

    /// Highest object number with an entry.
    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().copied().max().unwrap_or(0)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries were read.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the offset that follows the last `startxref` keyword.
///
/// Only the last 2 KiB are searched.
pub fn find_xref_offset(data: &[u8]) -> Result<u64> {
    let tail_start = data.len().saturating_sub(2048);
    let tail = &data[tail_start..];
    let keyword = b"startxref";
    let pos = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or(Error::InvalidXref)?;

    let after = skip_ws(&tail[pos + keyword.len()..]);
    let digits: Vec<u8> = after.iter().copied().take_while(u8::is_ascii_digit).collect();
    std::str::from_utf8(&digits)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or(Error::InvalidXref)
}

/// Parse the whole cross-reference chain of `data`.
pub fn parse_xref(data: &[u8]) -> Result<CrossRefTable> {
    let startxref = find_xref_offset(data)?;
    let mut entries = HashMap::new();
    let mut newest: Option<(Dict, XRefKind)> = None;
    let mut offset = Some(startxref);
    let mut visited = Vec::new();

    while let Some(current) = offset {
        if visited.contains(&current) || visited.len() > 100 {
            return Err(Error::InvalidPdf("cyclic or overlong /Prev chain".to_string()));
        }
        visited.push(current);

        let (section, trailer, kind) = parse_section(data, current)?;
        log::debug!("xref section at {}: {} entries ({:?})", current, section.len(), kind);

        // Newer sections win
        for (id, entry) in section {
            entries.entry(id).or_insert(entry);
        }

        // Hybrid file: the stream supplements the classic table at the same level
        if let Some(stm) = trailer.get("XRefStm").and_then(|o| o.as_integer()) {
            let (extra, _, _) = parse_section(data, stm as u64)?;
            for (id, entry) in extra {
                entries.entry(id).or_insert(entry);
            }
        }

        offset = trailer.get("Prev").and_then(|o| o.as_integer()).map(|p| p as u64);
        if newest.is_none() {
            newest = Some((trailer, kind));
        }
    }

    let (trailer, kind) = newest.ok_or(Error::InvalidXref)?;
    Ok(CrossRefTable {
        entries,
        trailer,
        kind,
        startxref,
    })
}

type Section = (Vec<(u32, XRefEntry)>, Dict, XRefKind);

fn parse_section(data: &[u8], offset: u64) -> Result<Section> {
    let start = usize::try_from(offset).map_err(|_| Error::InvalidXref)?;
    if start >= data.len() {
        return Err(Error::InvalidPdf(format!("xref offset {} beyond end of file", offset)));
    }
    let input = skip_ws(&data[start..]);

    if input.starts_with(b"xref") {
        let (entries, trailer) = parse_classic_table(&input[4..])?;
        Ok((entries, trailer, XRefKind::Table))
    } else {
        let (entries, trailer) = parse_xref_stream(input)?;
        Ok((entries, trailer, XRefKind::Stream))
    }
}

fn read_uint(input: &[u8]) -> Option<(u64, &[u8])> {
    let input = skip_ws(input);
    let len = input.iter().take_while(|c| c.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    let value = std::str::from_utf8(&input[..len]).ok()?.parse().ok()?;
    Some((value, &input[len..]))
}

/// Parse the subsections of a classic table and its trailer dictionary.
fn parse_classic_table(mut input: &[u8]) -> Result<(Vec<(u32, XRefEntry)>, Dict)> {
    let mut entries = Vec::new();

    loop {
        let rest = skip_ws(input);
        if rest.starts_with(b"trailer") {
            input = &rest[b"trailer".len()..];
            break;
        }

        let (first, rest) = read_uint(rest).ok_or(Error::InvalidXref)?;
        let (count, rest) = read_uint(rest).ok_or(Error::InvalidXref)?;
        if count > 10_000_000 {
            return Err(Error::InvalidPdf(format!("xref subsection count {} too large", count)));
        }
        input = rest;

        for i in 0..count {
            let (field1, rest) = read_uint(input).ok_or(Error::InvalidXref)?;
            let (generation, rest) = read_uint(rest).ok_or(Error::InvalidXref)?;
            let rest = skip_ws(rest);
            let flag = *rest.first().ok_or(Error::InvalidXref)?;
            input = &rest[1..];

            let entry = match flag {
                b'n' => XRefEntry::InUse {
                    offset: field1,
                    generation: generation as u16,
                },
                b'f' => XRefEntry::Free,
                _ => return Err(Error::InvalidXref),
            };
            entries.push(((first + i) as u32, entry));
        }
    }

    let (_, trailer) = parse_object(input).map_err(|_| Error::InvalidXref)?;
    match trailer {
        Object::Dictionary(dict) => Ok((entries, dict)),
        _ => Err(Error::InvalidXref),
    }
}

/// Parse a `/Type /XRef` stream object.
fn parse_xref_stream(input: &[u8]) -> Result<(Vec<(u32, XRefEntry)>, Dict)> {
    let (_, object, _) = parse_indirect_object(input)?;
    let dict = match &object {
        Object::Stream { dict, .. } => dict.clone(),
        _ => return Err(Error::InvalidPdf("xref stream is not a stream object".to_string())),
    };
    if dict.get("Type").and_then(|o| o.as_name()) != Some("XRef") {
        return Err(Error::InvalidPdf("expected /Type /XRef".to_string()));
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|o| o.as_array())
        .map(|a| a.iter().filter_map(|w| w.as_integer()).map(|w| w as usize).collect())
        .unwrap_or_default();
    if widths.len() != 3 {
        return Err(Error::InvalidPdf("invalid /W array in xref stream".to_string()));
    }

    let size = dict
        .get("Size")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::InvalidPdf("missing /Size in xref stream".to_string()))?;

    let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(|o| o.as_array()) {
        Some(index) => index
            .chunks(2)
            .filter_map(|pair| match pair {
                [start, count] => Some((start.as_integer()? as u32, count.as_integer()? as u32)),
                _ => None,
            })
            .collect(),
        None => vec![(0, size as u32)],
    };

    let decoded = object.decode_stream_data()?;
    let entry_size: usize = widths.iter().sum();
    let mut rows = decoded.chunks_exact(entry_size.max(1));
    let mut entries = Vec::new();

    for (start, count) in ranges {
        for i in 0..count {
            let row = rows
                .next()
                .ok_or_else(|| Error::InvalidPdf("truncated xref stream data".to_string()))?;
            let (f1, rest) = row.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);
            let entry_type = if widths[0] == 0 { 1 } else { read_be(f1) };

            let entry = match entry_type {
                0 => XRefEntry::Free,
                1 => XRefEntry::InUse {
                    offset: read_be(f2),
                    generation: read_be(f3) as u16,
                },
                2 => XRefEntry::Compressed {
                    stream_id: read_be(f2) as u32,
                    index: read_be(f3) as u32,
                },
                // Unknown types are treated as null references
                _ => XRefEntry::Free,
            };
            entries.push((start + i, entry));
        }
    }

    Ok((entries, dict))
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
