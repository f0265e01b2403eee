//! Front-matter fields from the intro lines.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: String,
    pub authors: String,
    pub language: String,
}

impl FrontMatter {
    fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.authors.is_empty() && !self.language.is_empty()
    }
}

/// Text after the first colon, cut at the first `<` and trimmed.
///
/// Lines without a colon yield an empty string.
pub fn text_after_colon(line: &str) -> &str {
    let Some((_, value)) = line.split_once(':') else {
        return "";
    };
    let value = match value.split_once('<') {
        Some((before_tag, _)) => before_tag,
        None => value,
    };
    value.trim()
}

/// First `Author:`, `Language:` and `Title:` line each; later duplicates are
/// ignored.
pub fn extract<S: AsRef<str>>(intro_lines: &[S]) -> FrontMatter {
    let mut out = FrontMatter::default();
    let mut seen = (false, false, false);
    for line in intro_lines {
        if out.is_complete() {
            break;
        }
        let line = line.as_ref();
        if line.starts_with("Author:") {
            if !seen.0 {
                out.authors = text_after_colon(line).to_string();
                seen.0 = true;
            }
        } else if line.starts_with("Language:") {
            if !seen.1 {
                out.language = text_after_colon(line).to_string();
                seen.1 = true;
            }
        } else if line.starts_with("Title:") && !seen.2 {
            out.title = text_after_colon(line).to_string();
            seen.2 = true;
        }
    }
    out
}
