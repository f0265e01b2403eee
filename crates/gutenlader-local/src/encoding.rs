//! Declared-encoding repair.
//!
//! Text files announce their character set in a front-matter line, and a fair
//! number of those announcements are misspelled. This module maps the known
//! broken labels to something a decoder understands and picks the decoder.

use encoding_rs::Encoding;
use std::borrow::Cow;

/// Scan pass encoding; decodes any byte stream without error.
pub const DEFAULT_ENCODING: &str = "iso-8859-1";

/// Broken labels seen in the corpus, already lower-cased and `cp-` folded.
const BROKEN_ENCODINGS: &[(&str, &str)] = &[
    ("", "cp1252"),
    ("a", "iso-8859-1"),
    ("iso latin-1", "iso-8859-1"),
    ("iso-latin-1", "iso-8859-1"),
    ("iso-646-us (us-ascii)", "ascii"),
    ("iso-8559-1", "iso-8859-1"),
    ("iso-859-1", "iso-8859-1"),
    ("iso-8858-1", "iso-8859-1"),
    ("iso-8859", "iso-8859-1"),
    ("iso 8859-1 (latin-1)", "iso-8859-1"),
    ("n", "iso-8859-1"),
    ("unicode utf-8", "utf-8"),
];

/// Names that mean true ISO-8859-1 rather than the WHATWG windows-1252 alias.
const LATIN1_ALIASES: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso_8859-1",
    "latin-1",
    "latin1",
    "l1",
];

/// 7-bit ASCII names. WHATWG folds these into windows-1252, which would turn
/// high bytes into letters instead of flagging them.
const ASCII_ALIASES: &[&str] = &["ascii", "us-ascii", "iso646-us", "iso-646-us"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLabel {
    /// Decoder name to use.
    pub name: String,
    /// The normalized declared label when it had to be corrected.
    pub broken: Option<String>,
}

fn normalize_label(label: &str) -> String {
    let lower = label.trim().to_lowercase();
    match lower.strip_prefix("cp-") {
        Some(rest) => format!("cp{rest}"),
        None => lower,
    }
}

/// Map a declared label to a decoder name. A label missing from the
/// correction table is returned normalized but otherwise unchanged.
pub fn resolve(label: &str) -> ResolvedLabel {
    let normalized = normalize_label(label);
    match BROKEN_ENCODINGS.iter().find(|(broken, _)| *broken == normalized) {
        Some((_, fixed)) => ResolvedLabel {
            name: (*fixed).to_string(),
            broken: Some(normalized),
        },
        None => ResolvedLabel {
            name: normalized,
            broken: None,
        },
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Decoder {
    Latin1,
    Ascii,
    Whatwg(&'static Encoding),
}

impl Decoder {
    pub fn name(&self) -> &'static str {
        match self {
            Decoder::Latin1 => DEFAULT_ENCODING,
            Decoder::Ascii => "us-ascii",
            Decoder::Whatwg(enc) => enc.name(),
        }
    }

    /// Undecodable sequences become U+FFFD.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Decoder::Latin1 => encoding_rs::mem::decode_latin1(bytes),
            Decoder::Ascii if encoding_rs::mem::is_ascii(bytes) => {
                encoding_rs::mem::decode_latin1(bytes)
            }
            Decoder::Ascii => Cow::Owned(
                bytes
                    .iter()
                    .map(|&b| if b.is_ascii() { b as char } else { '\u{fffd}' })
                    .collect(),
            ),
            Decoder::Whatwg(enc) => enc.decode_with_bom_removal(bytes).0,
        }
    }
}

pub fn decoder_for(name: &str) -> Option<Decoder> {
    let name = name.trim().to_ascii_lowercase();
    if LATIN1_ALIASES.contains(&name.as_str()) {
        return Some(Decoder::Latin1);
    }
    if ASCII_ALIASES.contains(&name.as_str()) {
        return Some(Decoder::Ascii);
    }
    Encoding::for_label(name.as_bytes()).map(Decoder::Whatwg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_label_means_windows_1252() {
        let r = resolve("");
        assert_eq!(r.name, "cp1252");
        assert_eq!(r.broken.as_deref(), Some(""));
    }

    #[test]
    fn misspelled_latin1_variants_resolve_to_iso_8859_1() {
        for label in ["ISO-8559-1", "iso-859-1", "ISO Latin-1", "iso 8859-1 (latin-1)", "N"] {
            assert_eq!(resolve(label).name, "iso-8859-1", "label={label:?}");
        }
        assert_eq!(resolve("Unicode UTF-8").name, "utf-8");
        assert_eq!(resolve("ISO-646-US (US-ASCII)").name, "ascii");
    }

    #[test]
    fn cp_hyphen_prefix_is_folded_and_passed_through() {
        let r = resolve("CP-1251");
        assert_eq!(r.name, "cp1251");
        assert!(r.broken.is_none());
    }

    #[test]
    fn unknown_labels_pass_through_lower_cased() {
        let r = resolve("UTF-8");
        assert_eq!(r.name, "utf-8");
        assert!(r.broken.is_none());
    }

    #[test]
    fn decoder_for_distinguishes_latin1_from_windows_1252() {
        // 0x80 is a C1 control in ISO-8859-1 and the euro sign in windows-1252.
        let latin1 = decoder_for("iso-8859-1").unwrap();
        assert_eq!(latin1.decode(b"\x80"), "\u{80}");
        let cp1252 = decoder_for("cp1252").unwrap();
        assert_eq!(cp1252.decode(b"\x80"), "\u{20ac}");
        assert_eq!(cp1252.name(), "windows-1252");
    }

    #[test]
    fn ascii_decoder_replaces_high_bytes() {
        let ascii = decoder_for("ascii").unwrap();
        assert_eq!(ascii.name(), "us-ascii");
        assert_eq!(ascii.decode(b"caf\xe9 \x80"), "caf\u{fffd} \u{fffd}");
        assert_eq!(ascii.decode(b"plain"), "plain");
        assert!(matches!(decoder_for("US-ASCII"), Some(Decoder::Ascii)));
    }

    #[test]
    fn decoder_for_rejects_names_no_decoder_knows() {
        assert!(decoder_for("klingon-8").is_none());
        assert!(decoder_for("utf-8").is_some());
    }

    #[test]
    fn utf8_decoder_replaces_invalid_sequences() {
        let utf8 = decoder_for("utf-8").unwrap();
        assert_eq!(utf8.decode(b"a\xffb"), "a\u{fffd}b");
    }

    proptest! {
        #[test]
        fn resolve_is_pure(label in any::<String>()) {
            prop_assert_eq!(resolve(&label), resolve(&label));
        }

        #[test]
        fn resolve_is_stable_for_every_table_entry(idx in 0usize..BROKEN_ENCODINGS.len()) {
            let (broken, fixed) = BROKEN_ENCODINGS[idx];
            let first = resolve(broken);
            prop_assert_eq!(first.name.as_str(), fixed);
            prop_assert_eq!(resolve(broken), first);
        }
    }
}
