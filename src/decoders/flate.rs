//! FlateDecode (zlib/deflate) via flate2.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// FlateDecode filter implementation.
///
/// Falls back to raw deflate when the zlib wrapper is damaged, and keeps
/// whatever was inflated before a late corruption.
pub struct FlateDecoder;

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => return Ok(output),
            Err(e) if !output.is_empty() => {
                log::warn!("FlateDecode partial recovery: {} bytes before error: {}", output.len(), e);
                return Ok(output);
            },
            Err(e) => e,
        };

        log::debug!("Zlib decode failed ({}), trying raw deflate", zlib_err);
        output.clear();
        match DeflateDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => Ok(output),
            Err(_) if !output.is_empty() => Ok(output),
            Err(e) => Err(Error::Decode(format!("FlateDecode failed: {} / {}", zlib_err, e))),
        }
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

/// Compress data for a `/Filter /FlateDecode` stream.
pub fn flate_encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
