//! Stream filters needed to read document structure.
//!
//! Only what the certifier has to look inside is decoded: cross-reference
//! streams, object streams and (for tests) page content. All of those are
//! FlateDecode in practice, optionally with a PNG or TIFF predictor.

use crate::error::{Error, Result};
use crate::object::Object;

mod flate;
mod predictor;

pub use flate::{flate_encode, FlateDecoder};
pub use predictor::{decode_predictor, DecodeParams};

/// Upper bound on the output of a single filter pipeline.
const MAX_DECODED_SIZE: usize = 256 * 1024 * 1024;

/// Trait for PDF stream decoders.
pub trait StreamDecoder {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of this decoder (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

fn decoder_for(filter_name: &str) -> Result<Box<dyn StreamDecoder>> {
    match filter_name {
        "FlateDecode" | "Fl" => Ok(Box::new(FlateDecoder)),
        other => Err(Error::Unsupported(format!("stream filter /{}", other))),
    }
}

/// Decode stream data through a filter pipeline, then undo any predictor.
pub fn decode_stream_with_params(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
) -> Result<Vec<u8>> {
    let mut current = data.to_vec();

    for filter_name in filters {
        let decoder = decoder_for(filter_name)?;
        current = decoder.decode(&current)?;
        if current.len() > MAX_DECODED_SIZE {
            return Err(Error::Decode(format!(
                "{} output of {} bytes exceeds limit",
                decoder.name(),
                current.len()
            )));
        }
    }

    if let Some(params) = params {
        if params.predictor != 1 {
            current = decode_predictor(&current, params)?;
        }
    }

    Ok(current)
}

impl DecodeParams {
    /// Read predictor parameters from a `/DecodeParms` entry.
    ///
    /// The entry may be a dictionary or an array of dictionaries (one per
    /// filter); the first dictionary wins.
    pub fn from_object(params_obj: &Object) -> Option<Self> {
        let dict = match params_obj {
            Object::Dictionary(d) => d,
            Object::Array(arr) => arr.iter().find_map(|obj| obj.as_dict())?,
            _ => return None,
        };

        let get = |key: &str, default: i64| dict.get(key).and_then(|o| o.as_integer()).unwrap_or(default);

        Some(DecodeParams {
            predictor: get("Predictor", 1),
            columns: get("Columns", 1).max(1) as usize,
            colors: get("Colors", 1).max(1) as usize,
            bits_per_component: get("BitsPerComponent", 8).max(1) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Dict;

    #[test]
    fn test_decode_stream_no_filters() {
        let data = b"plain";
        assert_eq!(decode_stream_with_params(data, &[], None).unwrap(), data);
    }

    #[test]
    fn test_decode_stream_unsupported_filter() {
        let err = decode_stream_with_params(b"x", &["JBIG2Decode".to_string()], None).unwrap_err();
        assert!(matches!(err, Error::Unsupported(ref m) if m.contains("JBIG2Decode")));
    }

    #[test]
    fn test_flate_with_png_up_predictor() {
        // Two rows of three columns, each row tagged with predictor 2 (Up)
        let encoded = vec![2, 1, 2, 3, 2, 1, 1, 1];
        let compressed = flate_encode(&encoded).unwrap();
        let params = DecodeParams {
            predictor: 12,
            columns: 3,
            colors: 1,
            bits_per_component: 8,
        };
        let out = decode_stream_with_params(&compressed, &["FlateDecode".to_string()], Some(&params)).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_decode_params_from_array() {
        let mut d = Dict::new();
        d.insert("Predictor".into(), Object::Integer(12));
        d.insert("Columns".into(), Object::Integer(5));
        let params = DecodeParams::from_object(&Object::Array(vec![Object::Null, Object::Dictionary(d)])).unwrap();
        assert_eq!(params.predictor, 12);
        assert_eq!(params.columns, 5);
        assert_eq!(params.colors, 1);
    }
}
