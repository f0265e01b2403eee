//! One text/HTML pair → one [`DocumentRecord`].
//!
//! Pure apart from the two file reads; safe to run on several worker threads
//! as long as they share one [`LanguageContext`].

use crate::decode::{decode_file, file_label};
use crate::language::LanguageContext;
use crate::{metadata, scan};
use gutenlader_core::{DocumentRecord, DocumentWarning, Result, WarningCode};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Record(DocumentRecord),
    /// Decoded text longer than the limit; carries the character count.
    TooLong(usize),
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub id: u64,
    pub outcome: Outcome,
    pub warnings: Vec<DocumentWarning>,
}

/// `max_length` counts characters of the decoded text; 0 disables the check.
pub fn convert_document(
    id: u64,
    text_path: &Path,
    html_path: &Path,
    max_length: usize,
    languages: &LanguageContext,
) -> Result<Conversion> {
    let text_file = file_label(text_path);
    let full_text = decode_file(text_path)?;
    let mut warnings = full_text.warnings;

    let length = full_text.content.chars().count();
    if max_length > 0 && length > max_length {
        let mb = length as f64 / 1024.0 / 1024.0;
        warnings.push(DocumentWarning::new(
            &text_file,
            WarningCode::FileTooLarge,
            format!("Skipping too long file: {mb:.2} MB"),
        ));
        return Ok(Conversion {
            id,
            outcome: Outcome::TooLong(length),
            warnings,
        });
    }

    let html = decode_file(html_path)?;
    warnings.extend(html.warnings);

    let scanned = scan::scan(&text_file, &full_text.content);
    let front = metadata::extract(&scanned.intro_lines);
    let text = scanned.body_text();
    warnings.extend(scanned.warnings);

    let language = languages.normalize(&text_file, &front.language);
    warnings.extend(language.warning);

    tracing::debug!(
        id,
        encoding = full_text.encoding,
        language = %language.code,
        text_chars = length,
        "converted {text_file}"
    );

    Ok(Conversion {
        id,
        outcome: Outcome::Record(DocumentRecord::new(
            id,
            &front.title,
            &front.authors,
            &language.code,
            text,
            html.content,
        )),
        warnings,
    })
}
