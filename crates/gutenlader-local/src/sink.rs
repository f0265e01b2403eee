//! Local [`DocumentSink`] implementations.

use gutenlader_core::{DocumentRecord, DocumentSink, Error, Result};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<DocumentRecord>,
    delete_all_calls: usize,
    batch_sizes: Vec<usize>,
}

/// Keeps everything in process memory. Mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn records(&self) -> Vec<DocumentRecord> {
        self.state().records.clone()
    }

    pub fn delete_all_calls(&self) -> usize {
        self.state().delete_all_calls
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state().batch_sizes.clone()
    }
}

#[async_trait::async_trait]
impl DocumentSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn delete_all(&self) -> Result<()> {
        let mut s = self.state();
        s.records.clear();
        s.delete_all_calls += 1;
        Ok(())
    }

    async fn bulk_insert(&self, records: Vec<DocumentRecord>) -> Result<()> {
        let mut s = self.state();
        if let Some(dup) = records
            .iter()
            .find(|r| s.records.iter().any(|existing| existing.id == r.id))
        {
            return Err(Error::Sink(format!("duplicate document id {}", dup.id)));
        }
        s.batch_sizes.push(records.len());
        s.records.extend(records);
        Ok(())
    }
}

/// Appends one JSON object per record to a file.
///
/// Each line carries the record fields plus `search_config`, so a loader on
/// the database side can build the full-text index without knowing the
/// language table.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn truncate(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::Sink(e.to_string()))?;
        }
        fs::File::create(path).map_err(|e| Error::Sink(format!("{}: {e}", path.display())))?;
        Ok(())
    }

    fn append(path: &Path, records: &[DocumentRecord]) -> Result<()> {
        Self::append_with(path, records, write_lines)
    }

    /// A failed write truncates the file back to where the batch started, so
    /// a retried batch never leaves duplicate lines behind.
    fn append_with<F>(path: &Path, records: &[DocumentRecord], write: F) -> Result<()>
    where
        F: FnOnce(&mut fs::File, &[DocumentRecord]) -> io::Result<()>,
    {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| Error::Sink(format!("{}: {e}", path.display())))?;
        let start = file
            .metadata()
            .map_err(|e| Error::Sink(format!("{}: {e}", path.display())))?
            .len();
        if let Err(e) = write(&mut file, records) {
            if let Err(rollback) = file.set_len(start) {
                tracing::warn!("{}: cannot roll back partial batch: {rollback}", path.display());
            }
            return Err(Error::Sink(format!("{}: {e}", path.display())));
        }
        Ok(())
    }
}

fn write_lines(file: &mut fs::File, records: &[DocumentRecord]) -> io::Result<()> {
    let mut w = BufWriter::new(file);
    for r in records {
        let line = serde_json::json!({
            "id": r.id,
            "title": r.title,
            "authors": r.authors,
            "language_code": r.language_code,
            "search_config": r.search_config(),
            "text": r.text,
            "html": r.html,
        });
        serde_json::to_writer(&mut w, &line)?;
        w.write_all(b"\n")?;
    }
    w.flush()
}

#[async_trait::async_trait]
impl DocumentSink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn delete_all(&self) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::truncate(&path))
            .await
            .map_err(|e| Error::Join(format!("jsonl truncate join failed: {e}")))?
    }

    async fn bulk_insert(&self, records: Vec<DocumentRecord>) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::append(&path, &records))
            .await
            .map_err(|e| Error::Join(format!("jsonl append join failed: {e}")))?
    }
}
