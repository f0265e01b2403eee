//! Boilerplate marker scanner.
//!
//! Splits decoded text into the front matter ("intro"), the body between the
//! start and end markers, and a trailer that is thrown away.

use gutenlader_core::{DocumentWarning, WarningCode};
use regex::Regex;
use std::sync::OnceLock;

fn start_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*\*+\s*START\s+OF\s+TH(E|IS)\s+PROJECT\s+GUTENBERG\s+EBOOK")
            .expect("start marker regex")
    })
}

fn end_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*\*+\s*END\s+OF\s+TH(E|IS)\s+PROJECT\s+GUTENBERG\s+EBOOK")
            .expect("end marker regex")
    })
}

pub fn is_start_marker(line: &str) -> bool {
    start_marker().is_match(line)
}

pub fn is_end_marker(line: &str) -> bool {
    end_marker().is_match(line)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    BeforeText,
    InText,
    AfterText,
}

/// Where a consumed line ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Intro,
    Body,
    Marker,
    Discarded,
}

impl ScanState {
    pub fn next(self, line: &str) -> (ScanState, LineRole) {
        match self {
            ScanState::BeforeText if is_start_marker(line) => {
                (ScanState::InText, LineRole::Marker)
            }
            ScanState::BeforeText => (ScanState::BeforeText, LineRole::Intro),
            ScanState::InText if is_end_marker(line) => (ScanState::AfterText, LineRole::Marker),
            ScanState::InText => (ScanState::InText, LineRole::Body),
            ScanState::AfterText => (ScanState::AfterText, LineRole::Discarded),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScannedText<'a> {
    pub intro_lines: Vec<&'a str>,
    pub body_lines: Vec<&'a str>,
    pub state: ScanState,
    pub warnings: Vec<DocumentWarning>,
}

impl ScannedText<'_> {
    pub fn body_text(&self) -> String {
        self.body_lines
            .join("\n")
            .trim_matches(|c| matches!(c, ' ' | '\n' | '\t'))
            .to_string()
    }
}

pub fn scan<'a>(file: &str, content: &'a str) -> ScannedText<'a> {
    let mut intro_lines = Vec::new();
    let mut body_lines = Vec::new();
    let mut state = ScanState::BeforeText;
    for line in content.split('\n') {
        let (next, role) = state.next(line);
        state = next;
        match role {
            LineRole::Intro => intro_lines.push(line),
            LineRole::Body => body_lines.push(line),
            LineRole::Marker | LineRole::Discarded => {}
        }
        if state == ScanState::AfterText {
            break;
        }
    }

    let mut warnings = Vec::new();
    match state {
        ScanState::BeforeText => warnings.push(DocumentWarning::new(
            file,
            WarningCode::NoStartMarker,
            "No gutenberg start marker found, document is considered to be empty",
        )),
        ScanState::InText => warnings.push(DocumentWarning::new(
            file,
            WarningCode::NoEndMarker,
            "No gutenberg end marker found, document might include unwanted suffix lines",
        )),
        ScanState::AfterText => {}
    }

    ScannedText {
        intro_lines,
        body_lines,
        state,
        warnings,
    }
}
