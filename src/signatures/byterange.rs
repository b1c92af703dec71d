//! ByteRange calculation for PDF signatures.
//!
//! A signature covers every byte of the file except the hex value of
//! `/Contents`. The covered region is written as
//! `[0 before start_after after_len]` in the signature dictionary, which
//! itself lies inside the covered region, so both values are reserved as
//! fixed-width placeholders and patched in place.

use crate::error::{Error, Result};
use crate::object::Object;
use sha2::{Digest, Sha256};
use std::ops::Range;

/// Smallest signature reservation, in DER bytes.
pub const MIN_RESERVED: usize = 16 * 1024;

/// Room left for the CMS structure around the embedded certificates.
const CMS_OVERHEAD: usize = 4 * 1024;

/// Width of each patched ByteRange number.
const NUMBER_WIDTH: usize = 10;

const BYTE_RANGE_PLACEHOLDER: i64 = 9_999_999_999;

/// Calculator for PDF signature byte ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRangeCalculator {
    /// DER bytes reserved for the signature
    reserved: usize,
}

impl ByteRangeCalculator {
    /// Reserve room for a signature of up to `reserved` DER bytes.
    pub fn new(reserved: usize) -> Self {
        Self { reserved }
    }

    /// Reservation for a CMS structure that embeds a chain of
    /// `chain_der_len` bytes: the larger of 16 KiB and twice the chain
    /// plus 4 KiB.
    pub fn for_chain(chain_der_len: usize) -> Self {
        Self::new(MIN_RESERVED.max(2 * chain_der_len + CMS_OVERHEAD))
    }

    /// DER bytes reserved.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Size of the written `/Contents` value: two hex digits per byte plus
    /// the angle brackets.
    pub fn placeholder_size(&self) -> usize {
        self.reserved * 2 + 2
    }

    /// `/Contents` value to stage; serialises as `<00…00>`.
    pub fn contents_placeholder(&self) -> Object {
        Object::String(vec![0u8; self.reserved])
    }

    /// `/ByteRange` value to stage; every number is at its widest.
    pub fn byte_range_placeholder() -> Object {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(BYTE_RANGE_PLACEHOLDER),
            Object::Integer(BYTE_RANGE_PLACEHOLDER),
            Object::Integer(BYTE_RANGE_PLACEHOLDER),
        ])
    }

    /// Calculate the ByteRange given where the `/Contents` value starts
    /// (at its `<`).
    pub fn calculate_byte_range(&self, file_size: usize, contents_offset: usize) -> [usize; 4] {
        let after_sig_start = contents_offset + self.placeholder_size();
        [0, contents_offset, after_sig_start, file_size.saturating_sub(after_sig_start)]
    }

    /// Format a ByteRange to exactly the placeholder's width.
    pub fn format_byte_range(byte_range: &[usize; 4]) -> Result<String> {
        if byte_range[1..].iter().any(|n| n.to_string().len() > NUMBER_WIDTH) {
            return Err(Error::Signing("Document too large for its signature byte range".to_string()));
        }
        Ok(format!(
            "[{} {:<w$} {:<w$} {:<w$}]",
            byte_range[0],
            byte_range[1],
            byte_range[2],
            byte_range[3],
            w = NUMBER_WIDTH
        ))
    }

    /// Position of the `/ByteRange` array (from `[` through `]`) within
    /// `window`.
    pub fn find_byte_range(window: &[u8]) -> Option<Range<usize>> {
        let key = find(window, b"/ByteRange")? + b"/ByteRange".len();
        let open = key + window[key..].iter().position(|&b| !is_space(b))?;
        if window[open] != b'[' {
            return None;
        }
        let close = open + window[open..].iter().position(|&b| b == b']')?;
        Some(open..close + 1)
    }

    /// Offset within `window` of the `<` opening the `/Contents` value.
    pub fn find_contents_offset(window: &[u8]) -> Option<usize> {
        let key = find(window, b"/Contents")? + b"/Contents".len();
        let open = key + window[key..].iter().position(|&b| !is_space(b))?;
        (window[open] == b'<').then_some(open)
    }

    /// Write the hex signature into a placeholder starting at `offset`,
    /// padding with zeros.
    pub fn insert_signature(&self, data: &mut [u8], offset: usize, signature: &[u8]) -> Result<()> {
        if signature.len() > self.reserved {
            return Err(Error::Signing(format!(
                "Signature ({} bytes) exceeds reserved space ({} bytes)",
                signature.len(),
                self.reserved
            )));
        }
        let end = offset + self.placeholder_size();
        let slot = data
            .get_mut(offset..end)
            .ok_or_else(|| Error::Signing("Signature placeholder outside the update".to_string()))?;
        if slot[0] != b'<' || slot[slot.len() - 1] != b'>' {
            return Err(Error::Signing("Signature placeholder not found at its offset".to_string()));
        }

        let hex = hex_upper(signature);
        slot[1..1 + hex.len()].copy_from_slice(hex.as_bytes());
        let close = slot.len() - 1;
        for byte in &mut slot[1 + hex.len()..close] {
            *byte = b'0';
        }
        Ok(())
    }

    /// Check that a ByteRange starts at zero, ends at the file end and has
    /// no overlap.
    pub fn validate_byte_range(byte_range: &[usize; 4], file_size: usize) -> Result<()> {
        let [offset1, length1, offset2, length2] = *byte_range;
        if offset1 != 0 {
            return Err(Error::InvalidPdf(format!("ByteRange must start at 0, got {}", offset1)));
        }
        if offset2 + length2 != file_size {
            return Err(Error::InvalidPdf(format!(
                "ByteRange must end at file size {}, got {}",
                file_size,
                offset2 + length2
            )));
        }
        if length1 > offset2 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange first range ({}) overlaps with second range start ({})",
                length1, offset2
            )));
        }
        Ok(())
    }

    /// Concatenation of the two covered ranges.
    pub fn extract_signed_bytes(data: &[u8], byte_range: &[usize; 4]) -> Result<Vec<u8>> {
        let first = byte_range[0]..byte_range[0] + byte_range[1];
        let second = byte_range[2]..byte_range[2] + byte_range[3];
        let (Some(a), Some(b)) = (data.get(first), data.get(second)) else {
            return Err(Error::InvalidPdf(format!(
                "ByteRange {:?} exceeds file size {}",
                byte_range,
                data.len()
            )));
        };
        let mut signed = Vec::with_capacity(a.len() + b.len());
        signed.extend_from_slice(a);
        signed.extend_from_slice(b);
        Ok(signed)
    }
}

/// SHA-256 over consecutive pieces.
pub fn digest_parts(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

fn hex_upper(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8] = b"0123456789ABCDEF";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
        hex.push(HEX_CHARS[(byte & 0x0F) as usize] as char);
    }
    hex
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ObjectSerializer;

    #[test]
    fn test_reservation_policy() {
        assert_eq!(ByteRangeCalculator::for_chain(1000).reserved(), MIN_RESERVED);
        assert_eq!(ByteRangeCalculator::for_chain(10_000).reserved(), 24_096);
    }

    #[test]
    fn test_placeholder_serialises_to_full_width() {
        let calc = ByteRangeCalculator::new(8);
        let written = ObjectSerializer::new().serialize_to_string(&calc.contents_placeholder());
        assert_eq!(written, "<0000000000000000>");
        assert_eq!(written.len(), calc.placeholder_size());
    }

    #[test]
    fn test_patched_byte_range_keeps_width() {
        let placeholder = ObjectSerializer::new().serialize_to_string(&ByteRangeCalculator::byte_range_placeholder());
        let patched = ByteRangeCalculator::format_byte_range(&[0, 400, 34_402, 1_200]).unwrap();
        assert_eq!(patched.len(), placeholder.len());
        assert_eq!(patched, "[0 400        34402      1200      ]");
    }

    #[test]
    fn test_calculate_byte_range() {
        let calc = ByteRangeCalculator::new(49);
        // 49 bytes = 100 char placeholder
        assert_eq!(calc.calculate_byte_range(1000, 400), [0, 400, 500, 500]);
    }

    #[test]
    fn test_find_placeholders() {
        let window = b"<< /Type /Sig /ByteRange [0 9 9 9] /Contents\n<0000> >>";
        let range = ByteRangeCalculator::find_byte_range(window).unwrap();
        assert_eq!(&window[range], b"[0 9 9 9]");
        let offset = ByteRangeCalculator::find_contents_offset(window).unwrap();
        assert_eq!(&window[offset..offset + 6], b"<0000>");
    }

    #[test]
    fn test_insert_signature() {
        let calc = ByteRangeCalculator::new(4);
        let mut data = b"XX<00000000>YY".to_vec();
        calc.insert_signature(&mut data, 2, &[0xAB, 0xCD]).unwrap();
        assert_eq!(&data, b"XX<ABCD0000>YY");
    }

    #[test]
    fn test_insert_signature_too_large() {
        let calc = ByteRangeCalculator::new(4);
        let mut data = b"XX<00000000>YY".to_vec();
        let err = calc.insert_signature(&mut data, 2, &[1, 2, 3, 4, 5]).unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
        assert_eq!(&data, b"XX<00000000>YY");
    }

    #[test]
    fn test_extract_signed_bytes() {
        let signed = ByteRangeCalculator::extract_signed_bytes(b"AAABBBCCC", &[0, 3, 6, 3]).unwrap();
        assert_eq!(signed, b"AAACCC");
        assert!(ByteRangeCalculator::extract_signed_bytes(b"AAA", &[0, 3, 6, 3]).is_err());
    }

    #[test]
    fn test_validate_byte_range() {
        assert!(ByteRangeCalculator::validate_byte_range(&[0, 100, 150, 50], 200).is_ok());
        assert!(ByteRangeCalculator::validate_byte_range(&[10, 100, 150, 50], 200).is_err());
        assert!(ByteRangeCalculator::validate_byte_range(&[0, 100, 150, 100], 200).is_err());
        assert!(ByteRangeCalculator::validate_byte_range(&[0, 160, 150, 50], 200).is_err());
    }

    #[test]
    fn test_digest_parts_matches_whole() {
        assert_eq!(
            digest_parts(&[b"AAA".as_slice(), b"CCC".as_slice()]),
            digest_parts(&[b"AAACCC".as_slice()])
        );
        assert_eq!(digest_parts(&[]).len(), 32);
    }
}
