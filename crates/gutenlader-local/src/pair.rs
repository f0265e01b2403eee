//! Recursive discovery of `{id}-8.txt` / `{id}-h.htm` pairs.

use gutenlader_core::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Html,
}

fn document_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)-(8\.txt|h\.htm)$").expect("document name regex"))
}

/// Id and kind encoded in a file name, if it follows the corpus convention.
pub fn parse_document_name(name: &str) -> Option<(u64, DocumentKind)> {
    let caps = document_name().captures(name)?;
    let id = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let kind = match caps.get(2)?.as_str() {
        "8.txt" => DocumentKind::Text,
        _ => DocumentKind::Html,
    };
    Some((id, kind))
}

#[derive(Debug, Clone, Default)]
pub struct PathPairing {
    pub text: BTreeMap<u64, PathBuf>,
    pub html: BTreeMap<u64, PathBuf>,
}

impl PathPairing {
    /// Ids with both renditions, ascending.
    pub fn eligible_ids(&self) -> Vec<u64> {
        self.text
            .keys()
            .filter(|id| self.html.contains_key(id))
            .copied()
            .collect()
    }

    pub fn paths(&self, id: u64) -> Option<(&Path, &Path)> {
        Some((self.text.get(&id)?.as_path(), self.html.get(&id)?.as_path()))
    }
}

/// Walk `root` and index every file whose name carries a document id.
///
/// Any walk error (unreadable root or subdirectory) aborts the scan.
/// Symlinked files are indexed without being resolved; a dangling one fails
/// later as a single unreadable document.
pub fn scan_documents(root: &Path) -> Result<PathPairing> {
    if !root.is_dir() {
        return Err(Error::Scan(format!(
            "{} is not a readable directory",
            root.display()
        )));
    }
    let mut out = PathPairing::default();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::Scan(format!("{}: {e}", root.display())))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some((id, kind)) = parse_document_name(name) else {
            continue;
        };
        let map = match kind {
            DocumentKind::Text => &mut out.text,
            DocumentKind::Html => &mut out.html,
        };
        map.insert(id, entry.into_path());
    }
    tracing::info!(
        text_files = out.text.len(),
        html_files = out.html.len(),
        "scanned {}",
        root.display()
    );
    Ok(out)
}
