//! Byte-level reading of corpus files.

use crate::encoding::{self, Decoder, DEFAULT_ENCODING};
use crate::metadata::text_after_colon;
use crate::scan::{is_end_marker, is_start_marker};
use gutenlader_core::{DocumentWarning, Error, Result, WarningCode};
use std::path::Path;

pub const ENCODING_MARKER: &str = "Character set encoding:";

#[derive(Debug, Clone)]
pub struct DecodedText {
    pub content: String,
    /// Decoder actually used for `content`.
    pub encoding: &'static str,
    pub warnings: Vec<DocumentWarning>,
}

/// Fold `\r\n` and lone `\r` into `\n`.
pub fn normalize_newlines(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'\r' => {
                out.push(b'\n');
                if raw.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

/// The label from a `Character set encoding:` line above the first marker.
pub fn declared_encoding(content: &str) -> Option<&str> {
    for line in content.split('\n') {
        if is_start_marker(line) || is_end_marker(line) {
            break;
        }
        if line.starts_with(ENCODING_MARKER) {
            return Some(text_after_colon(line));
        }
    }
    None
}

pub fn decode_bytes(file: &str, raw: &[u8]) -> DecodedText {
    let mut warnings = Vec::new();
    let bytes = normalize_newlines(raw);
    let latin1 = Decoder::Latin1;
    let scanned = latin1.decode(&bytes);

    let name = match declared_encoding(&scanned) {
        Some(label) => {
            let resolved = encoding::resolve(label);
            if let Some(broken) = &resolved.broken {
                warnings.push(DocumentWarning::new(
                    file,
                    WarningCode::MappedBrokenEncoding,
                    format!("Mapping broken encoding {broken:?} to {:?}", resolved.name),
                ));
            }
            resolved.name
        }
        None => {
            warnings.push(DocumentWarning::new(
                file,
                WarningCode::CannotDetermineEncoding,
                format!("Cannot determine encoding, using default {DEFAULT_ENCODING}"),
            ));
            DEFAULT_ENCODING.to_string()
        }
    };

    let (content, used) = if name == DEFAULT_ENCODING {
        (scanned.into_owned(), latin1.name())
    } else {
        match encoding::decoder_for(&name) {
            Some(decoder) => (decoder.decode(&bytes).into_owned(), decoder.name()),
            None => {
                warnings.push(DocumentWarning::new(
                    file,
                    WarningCode::UnknownEncoding,
                    format!("Cannot find decoder for {name:?}, using default encoding"),
                ));
                (scanned.into_owned(), latin1.name())
            }
        }
    };

    DecodedText {
        content: content
            .trim_matches(|c| matches!(c, ' ' | '\n' | '\t'))
            .to_string(),
        encoding: used,
        warnings,
    }
}

pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read and decode one file. Only I/O failures are errors.
pub fn decode_file(path: &Path) -> Result<DecodedText> {
    let raw = std::fs::read(path)
        .map_err(|e| Error::Read(format!("Cannot process \"{}\": {e}", path.display())))?;
    Ok(decode_bytes(&file_label(path), &raw))
}
