//! Declared language → ISO-639-1 code.

use gutenlader_core::{DocumentWarning, WarningCode, UNKNOWN_LANGUAGE_CODE};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("", UNKNOWN_LANGUAGE_CODE),
    ("Afrikaans", "af"),
    ("Arabic", "ar"),
    ("Catalan", "ca"),
    ("Chinese", "zh"),
    ("Czech", "cs"),
    ("Danish", "da"),
    ("Dutch", "nl"),
    ("English", "en"),
    ("Esperanto", "eo"),
    ("Estonian", "et"),
    ("Finnish", "fi"),
    ("French", "fr"),
    ("Frisian", "fy"),
    ("Galician", "gl"),
    ("German", "de"),
    ("Greek", "el"),
    ("Hungarian", "hu"),
    ("Icelandic", "is"),
    ("Inuktitut", "iu"),
    ("Italian", "it"),
    ("Irish", "ga"),
    ("Japanese", "jp"),
    ("Latin", "la"),
    ("Norwegian", "no"),
    ("Polish", "pl"),
    ("Portuguese", "pt"),
    ("Russian", "ru"),
    ("Serbian", "sr"),
    ("Slovenian", "sl"),
    ("Spanish", "es"),
    ("Swedish", "sv"),
    ("Tagalog", "tl"),
    ("Welsh", "cy"),
];

/// Languages with documents in the corpus but no ISO-639-1 code.
const NO_ISO_LANGUAGES: &[&str] = &[
    "Arapaho", "Bagobo", "Cebuano", "Friulian", "Gascon", "Iloko", "Ilocano", "Quiche",
];

fn lookup(language: &str) -> Option<&'static str> {
    LANGUAGE_CODES
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, code)| *code)
}

/// Heuristic: a single language is one lower-case token of letters and
/// hyphens. Anything else ("English and French", "German; Latin") is taken
/// to name several languages.
///
/// Approximate on purpose; it can misclassify single names containing other
/// characters.
pub fn looks_like_single_language(language_lower: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z\-]+$").expect("single language regex"))
        .is_match(language_lower)
}

/// Upper-case the first letter of every word and lower-case the rest, where
/// a word is a run of alphabetic characters.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub code: String,
    pub warning: Option<DocumentWarning>,
}

/// Per-run language state: which names were already reported.
///
/// Shared by reference between converters; one context per import run.
#[derive(Debug, Default)]
pub struct LanguageContext {
    warned: Mutex<HashSet<(WarningCode, String)>>,
}

impl LanguageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `(code, name)` is seen in this context.
    fn first_report(&self, code: WarningCode, name: &str) -> bool {
        match self.warned.lock() {
            Ok(mut warned) => warned.insert((code, name.to_string())),
            Err(poisoned) => poisoned.into_inner().insert((code, name.to_string())),
        }
    }

    pub fn unmapped_languages(&self) -> Vec<String> {
        let warned = match self.warned.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut out: Vec<String> = warned
            .iter()
            .filter(|(code, _)| *code == WarningCode::UnknownLanguage)
            .map(|(_, name)| name.clone())
            .collect();
        out.sort();
        out
    }

    pub fn normalize(&self, file: &str, language: &str) -> Normalized {
        if language.chars().count() == 2 {
            return Normalized {
                code: language.to_lowercase(),
                warning: None,
            };
        }
        let cleaned = title_case(language);
        if let Some(code) = lookup(language).or_else(|| lookup(&cleaned)) {
            return Normalized {
                code: code.to_string(),
                warning: None,
            };
        }

        let warning = if NO_ISO_LANGUAGES.contains(&cleaned.as_str()) {
            self.first_report(WarningCode::NoIsoLanguage, &cleaned)
                .then(|| {
                    DocumentWarning::new(
                        file,
                        WarningCode::NoIsoLanguage,
                        format!(
                            "Language {language:?} has no ISO-639-1 code, treating as unknown language"
                        ),
                    )
                })
        } else if !looks_like_single_language(&language.to_lowercase()) {
            Some(DocumentWarning::new(
                file,
                WarningCode::MultipleLanguages,
                format!(
                    "Document is written in multiple languages, treating as unknown language: {language:?}"
                ),
            ))
        } else {
            self.first_report(WarningCode::UnknownLanguage, &cleaned)
                .then(|| {
                    DocumentWarning::new(
                        file,
                        WarningCode::UnknownLanguage,
                        format!(
                            "Unknown language {cleaned:?} should be added to the language code table \
                             or the list of languages without ISO code"
                        ),
                    )
                })
        };

        Normalized {
            code: UNKNOWN_LANGUAGE_CODE.to_string(),
            warning,
        }
    }
}
