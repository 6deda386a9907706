//! Stream filter decoding.
//!
//! Applies the `/Filter` chain of a stream with its `/DecodeParms`.
//! Flate, LZW and ASCII85 stages (predictors included) go through lopdf;
//! the two filters lopdf lacks are decoded here. Image codecs are
//! terminal: their data is handed back undecoded.

use lopdf::{Dictionary, Object, Stream};

use crate::error::BackendError;

/// Decode the content of `stream` through its whole filter chain.
pub fn decode_stream(stream: &Stream) -> Result<Vec<u8>, BackendError> {
    if !stream.dict.has(b"Filter") {
        return Ok(stream.content.clone());
    }
    let filters = stream.filters()?;

    let parms: Vec<Option<&Dictionary>> = match stream.dict.get(b"DecodeParms") {
        Ok(Object::Dictionary(d)) => vec![Some(d)],
        Ok(Object::Array(items)) => items.iter().map(|o| o.as_dict().ok()).collect(),
        _ => Vec::new(),
    };

    let mut data = stream.content.clone();
    for (i, name) in filters.into_iter().enumerate() {
        let parms = parms.get(i).copied().flatten();
        data = match name {
            b"FlateDecode" | b"Fl" => decode_with_lopdf("FlateDecode", parms, data)?,
            b"LZWDecode" | b"LZW" => decode_with_lopdf("LZWDecode", parms, data)?,
            b"ASCII85Decode" | b"A85" => decode_with_lopdf("ASCII85Decode", None, data)?,
            b"ASCIIHexDecode" | b"AHx" => decode_ascii_hex(&data)?,
            b"RunLengthDecode" | b"RL" => decode_run_length(&data),
            b"DCTDecode" | b"DCT" | b"JPXDecode" | b"CCITTFaxDecode" | b"CCF" | b"JBIG2Decode" => {
                return Ok(data);
            }
            other => {
                return Err(BackendError::Unsupported(format!(
                    "filter /{}",
                    String::from_utf8_lossy(other)
                )));
            }
        };
    }
    Ok(data)
}

/// Run one filter stage through lopdf. A corrupt Flate tail keeps the
/// prefix that inflated.
fn decode_with_lopdf(
    filter: &str,
    parms: Option<&Dictionary>,
    data: Vec<u8>,
) -> Result<Vec<u8>, BackendError> {
    let mut dict = Dictionary::new();
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    if let Some(parms) = parms {
        dict.set("DecodeParms", parms.clone());
    }
    Stream::new(dict, data)
        .decompressed_content()
        .map_err(|e| BackendError::Parse(format!("{filter} failed: {e}")))
}

/// `ASCIIHexDecode`: whitespace ignored, `>` ends the data, an odd final
/// digit is padded with zero.
pub fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &b in data {
        if b == b'>' {
            break;
        }
        if crate::lexer::is_whitespace(b) {
            continue;
        }
        let v = crate::lexer::hex_value(b).ok_or_else(|| {
            BackendError::Parse(format!("ASCIIHexDecode: invalid digit {:?}", b as char))
        })?;
        match high.take() {
            Some(h) => out.push((h << 4) | v),
            None => high = Some(v),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

/// `RunLengthDecode`. Stops at the EOD byte (128) or at the end of data.
pub fn decode_run_length(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let len = data[i];
        i += 1;
        match len {
            0..=127 => {
                let end = (i + usize::from(len) + 1).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            128 => break,
            _ => {
                if let Some(&b) = data.get(i) {
                    out.extend(std::iter::repeat_n(b, 257 - usize::from(len)));
                }
                i += 1;
            }
        }
    }
    out
}
