//! Byte input decoding.
//!
//! [`decode_to_utf8`] turns the raw bytes handed to
//! [`Document::parse_bytes`](crate::Document::parse_bytes) into UTF-8 text:
//!
//! 1. A byte order mark, if present, selects UTF-8 or UTF-16 and is dropped.
//! 2. Without a BOM the input is assumed to be UTF-8.
//! 3. An `encoding="..."` label in the XML declaration overrides the
//!    default when it names something other than UTF-8 (or UTF-16 when a
//!    UTF-16 BOM was seen).
//!
//! Transcoding goes through `encoding_rs`.

use thiserror::Error;

/// An error raised while detecting or converting the input encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The XML declaration names an encoding `encoding_rs` does not know.
    #[error("unsupported encoding: {0}")]
    Unsupported(String),
    /// The bytes are not valid in the detected encoding.
    #[error("malformed byte sequence for encoding {0}")]
    Malformed(String),
}

/// Inspects the byte order mark.
///
/// Returns the encoding label and the number of BOM bytes to skip.
///
/// ```
/// use xmlguard::encoding::detect_encoding;
///
/// assert_eq!(detect_encoding(b"\xEF\xBB\xBF<r/>"), ("UTF-8", 3));
/// assert_eq!(detect_encoding(b"\xFF\xFE<\0"), ("UTF-16LE", 2));
/// assert_eq!(detect_encoding(b"<r/>"), ("UTF-8", 0));
/// ```
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => ("UTF-8", 3),
        [0xFE, 0xFF, ..] => ("UTF-16BE", 2),
        [0xFF, 0xFE, ..] => ("UTF-16LE", 2),
        _ => ("UTF-8", 0),
    }
}

/// Transcodes `bytes` from the encoding named by `label` into UTF-8.
///
/// # Errors
///
/// Returns `EncodingError::Unsupported` for unknown labels and
/// `EncodingError::Malformed` if the bytes do not decode cleanly.
pub fn transcode(bytes: &[u8], label: &str) -> Result<String, EncodingError> {
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| EncodingError::Unsupported(label.to_owned()))?;
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(EncodingError::Malformed(label.to_owned()));
    }
    Ok(text.into_owned())
}

/// Decodes raw XML bytes into a UTF-8 string.
///
/// # Errors
///
/// Returns `EncodingError` if the declared encoding is unsupported or the
/// bytes are malformed for the detected encoding.
///
/// ```
/// use xmlguard::encoding::decode_to_utf8;
///
/// let latin1 = b"<?xml version='1.0' encoding='ISO-8859-1'?><r>caf\xE9</r>";
/// assert!(decode_to_utf8(latin1).unwrap().contains("caf\u{e9}"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    let (bom_encoding, skip) = detect_encoding(bytes);
    let content = &bytes[skip..];

    if bom_encoding != "UTF-8" {
        // The declaration inside a UTF-16 document can only restate UTF-16.
        return transcode(content, bom_encoding);
    }

    match declared_encoding(content) {
        Some(label) if !is_utf8_label(&label) => transcode(content, &label),
        _ => std::str::from_utf8(content)
            .map(str::to_owned)
            .map_err(|_| EncodingError::Malformed("UTF-8".to_owned())),
    }
}

/// Reads the `encoding` pseudo-attribute from an ASCII-compatible XML
/// declaration at the start of `bytes`.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    if !bytes.starts_with(b"<?xml") {
        return None;
    }
    let end = bytes.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&bytes[..end]).ok()?;
    let after = decl[decl.find("encoding")? + "encoding".len()..].trim_start();
    let after = after.strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|&c| c == '"' || c == '\'')?;
    let value = &after[1..];
    Some(value[..value.find(quote)?].to_owned())
}

fn is_utf8_label(label: &str) -> bool {
    matches!(label.to_ascii_uppercase().as_str(), "UTF-8" | "UTF8")
}
