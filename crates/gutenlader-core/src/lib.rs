use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("scan failed: {0}")]
    Scan(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("sink failed: {0}")]
    Sink(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("worker failed: {0}")]
    Join(String),
}

impl Error {
    /// Stable machine-readable code for JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Scan(_) => "scan_failed",
            Error::Read(_) => "read_failed",
            Error::Sink(_) => "sink_failed",
            Error::Config(_) => "invalid_config",
            Error::Join(_) => "worker_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Language code used when the declared language cannot be mapped to ISO-639-1.
pub const UNKNOWN_LANGUAGE_CODE: &str = "??";

pub const MAX_TITLE_LENGTH: usize = 2048;
pub const MAX_AUTHORS_LENGTH: usize = 2048;

/// Stable codes for the recoverable problems reported while importing.
///
/// The codes are part of the operator interface: they appear in the log and
/// are what `--ignore` lists refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WarningCode {
    #[serde(rename = "W100")]
    MappedBrokenEncoding,
    #[serde(rename = "W101")]
    CannotDetermineEncoding,
    #[serde(rename = "W102")]
    UnknownEncoding,
    #[serde(rename = "W200")]
    NoStartMarker,
    #[serde(rename = "W201")]
    NoEndMarker,
    #[serde(rename = "W300")]
    NoIsoLanguage,
    #[serde(rename = "W301")]
    MultipleLanguages,
    #[serde(rename = "W302")]
    UnknownLanguage,
    #[serde(rename = "W400")]
    FileTooLarge,
}

impl WarningCode {
    pub const ALL: [WarningCode; 9] = [
        WarningCode::MappedBrokenEncoding,
        WarningCode::CannotDetermineEncoding,
        WarningCode::UnknownEncoding,
        WarningCode::NoStartMarker,
        WarningCode::NoEndMarker,
        WarningCode::NoIsoLanguage,
        WarningCode::MultipleLanguages,
        WarningCode::UnknownLanguage,
        WarningCode::FileTooLarge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WarningCode::MappedBrokenEncoding => "W100",
            WarningCode::CannotDetermineEncoding => "W101",
            WarningCode::UnknownEncoding => "W102",
            WarningCode::NoStartMarker => "W200",
            WarningCode::NoEndMarker => "W201",
            WarningCode::NoIsoLanguage => "W300",
            WarningCode::MultipleLanguages => "W301",
            WarningCode::UnknownLanguage => "W302",
            WarningCode::FileTooLarge => "W400",
        }
    }

    /// Codes suppressed unless the operator asks for them: the noisy, expected
    /// categories of a real corpus.
    pub fn default_ignored() -> BTreeSet<WarningCode> {
        [
            WarningCode::MappedBrokenEncoding,
            WarningCode::CannotDetermineEncoding,
            WarningCode::NoStartMarker,
            WarningCode::NoEndMarker,
            WarningCode::NoIsoLanguage,
            WarningCode::MultipleLanguages,
            WarningCode::FileTooLarge,
        ]
        .into_iter()
        .collect()
    }

    /// Parse a comma separated list such as `"W100, W201"`.
    ///
    /// Blank entries are skipped, so an empty string enables every warning.
    pub fn parse_list(s: &str) -> Result<BTreeSet<WarningCode>> {
        s.split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(WarningCode::from_str)
            .collect()
    }

    pub fn join_list<'a>(codes: impl IntoIterator<Item = &'a WarningCode>) -> String {
        codes
            .into_iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarningCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        WarningCode::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown warning code {s:?}")))
    }
}

/// A recoverable problem found while converting one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWarning {
    /// File name (not the full path) the warning is about.
    pub file: String,
    pub code: WarningCode,
    pub message: String,
}

impl DocumentWarning {
    pub fn new(file: impl Into<String>, code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for DocumentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.file, self.code, self.message)
    }
}

/// The normalized unit handed to a [`DocumentSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: u64,
    pub title: String,
    pub authors: String,
    /// ISO-639-1 code or [`UNKNOWN_LANGUAGE_CODE`]; never empty.
    pub language_code: String,
    /// Body text used for searching.
    pub text: String,
    /// HTML rendition used for display only.
    pub html: String,
}

impl DocumentRecord {
    pub fn new(
        id: u64,
        title: &str,
        authors: &str,
        language_code: &str,
        text: String,
        html: String,
    ) -> Self {
        let language_code = if language_code.is_empty() {
            UNKNOWN_LANGUAGE_CODE.to_string()
        } else {
            language_code.to_string()
        };
        Self {
            id,
            title: truncate_chars(title, MAX_TITLE_LENGTH),
            authors: truncate_chars(authors, MAX_AUTHORS_LENGTH),
            language_code,
            text,
            html,
        }
    }

    /// Full-text search configuration for this record's language.
    pub fn search_config(&self) -> &'static str {
        search_config_for(&self.language_code)
    }
}

/// Languages the storage engine ships a stemming configuration for.
const SEARCH_CONFIGS: &[(&str, &str)] = &[
    ("ar", "arabic"),
    ("hy", "armenian"),
    ("eu", "basque"),
    ("ca", "catalan"),
    ("da", "danish"),
    ("nl", "dutch"),
    ("en", "english"),
    ("fi", "finnish"),
    ("fr", "french"),
    ("de", "german"),
    ("el", "greek"),
    ("hi", "hindi"),
    ("hu", "hungarian"),
    ("id", "indonesian"),
    ("ga", "irish"),
    ("it", "italian"),
    ("lt", "lithuanian"),
    ("ne", "nepali"),
    ("no", "norwegian"),
    ("pt", "portuguese"),
    ("ro", "romanian"),
    ("ru", "russian"),
    ("sr", "serbian"),
    ("es", "spanish"),
    ("sv", "swedish"),
    ("ta", "tamil"),
    ("tr", "turkish"),
    ("yi", "yiddish"),
];

pub const SIMPLE_SEARCH_CONFIG: &str = "simple";

pub fn search_config_for(language_code: &str) -> &'static str {
    SEARCH_CONFIGS
        .iter()
        .find(|(code, _)| *code == language_code)
        .map(|(_, config)| *config)
        .unwrap_or(SIMPLE_SEARCH_CONFIG)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => s[..byte].to_string(),
        None => s.to_string(),
    }
}

/// Persistent store the importer writes to.
///
/// Implementations do their own indexing as a side effect of insertion.
#[async_trait::async_trait]
pub trait DocumentSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn delete_all(&self) -> Result<()>;
    /// Ownership of the batch moves to the sink.
    async fn bulk_insert(&self, records: Vec<DocumentRecord>) -> Result<()>;
}
