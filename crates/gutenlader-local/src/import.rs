//! End-to-end import run: pair, convert, batch, flush.

use crate::convert::{convert_document, Conversion, Outcome};
use crate::language::LanguageContext;
use crate::pair::scan_documents;
use futures_util::stream::{self, StreamExt};
use gutenlader_core::{DocumentRecord, DocumentSink, DocumentWarning, Error, Result, WarningCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_COUNT: usize = 100;
pub const DEFAULT_MAX_LENGTH: usize = 512 * 1024;
pub const DEFAULT_FLUSH_RETRIES: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    pub base_dir: PathBuf,
    /// 0 = no limit.
    pub max_count: usize,
    /// Characters of decoded text; 0 = no limit.
    pub max_length: usize,
    pub ignore: BTreeSet<WarningCode>,
    /// Documents converted concurrently. 1 keeps the run strictly sequential.
    pub jobs: usize,
    /// Extra attempts for a failed batch before the run gives up.
    pub flush_retries: usize,
}

impl ImportOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_count: DEFAULT_MAX_COUNT,
            max_length: DEFAULT_MAX_LENGTH,
            ignore: WarningCode::default_ignored(),
            jobs: 1,
            flush_retries: DEFAULT_FLUSH_RETRIES,
        }
    }
}

/// Cooperative cancellation, checked once per document.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningCount {
    pub emitted: usize,
    pub suppressed: usize,
}

/// Applies the operator's suppression list and counts what went by.
#[derive(Debug, Clone, Default)]
pub struct WarningFilter {
    ignore: BTreeSet<WarningCode>,
    counts: BTreeMap<WarningCode, WarningCount>,
}

impl WarningFilter {
    pub fn new(ignore: BTreeSet<WarningCode>) -> Self {
        Self {
            ignore,
            counts: BTreeMap::new(),
        }
    }

    /// Logs `w` unless its code is suppressed. Returns whether it was logged.
    pub fn emit(&mut self, w: &DocumentWarning) -> bool {
        let count = self.counts.entry(w.code).or_default();
        if self.ignore.contains(&w.code) {
            count.suppressed += 1;
            return false;
        }
        count.emitted += 1;
        tracing::warn!(code = %w.code, "{w}");
        true
    }

    pub fn counts(&self) -> &BTreeMap<WarningCode, WarningCount> {
        &self.counts
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub text_files: usize,
    pub html_files: usize,
    pub eligible: usize,
    pub selected: usize,
    pub imported: usize,
    pub skipped_too_long: usize,
    pub failed: usize,
    pub failed_ids: Vec<u64>,
    pub batches: usize,
    pub cancelled: bool,
    pub warnings: BTreeMap<WarningCode, WarningCount>,
    /// Single-language names that need an entry in the language table.
    pub unmapped_languages: Vec<String>,
}

async fn flush(
    sink: &dyn DocumentSink,
    mut batch: Vec<DocumentRecord>,
    retries: usize,
) -> Result<()> {
    let mut attempt = 0;
    loop {
        let payload = if attempt < retries {
            batch.clone()
        } else {
            std::mem::take(&mut batch)
        };
        match sink.bulk_insert(payload).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < retries => {
                attempt += 1;
                tracing::warn!(attempt, "{} insert failed, retrying: {e}", sink.name());
            }
            Err(e) => return Err(e),
        }
    }
}

struct Batcher<'a> {
    sink: &'a dyn DocumentSink,
    retries: usize,
    pending: Vec<DocumentRecord>,
}

impl Batcher<'_> {
    async fn push(&mut self, record: DocumentRecord, report: &mut ImportReport) -> Result<()> {
        self.pending.push(record);
        if self.pending.len() >= BATCH_SIZE {
            self.flush(report).await?;
        }
        Ok(())
    }

    async fn flush(&mut self, report: &mut ImportReport) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let n = batch.len();
        flush(self.sink, batch, self.retries).await?;
        report.imported += n;
        report.batches += 1;
        tracing::info!(
            batch = report.batches,
            imported = report.imported,
            selected = report.selected,
            "flushed {n} documents to {}",
            self.sink.name()
        );
        Ok(())
    }
}

/// Run one import into `sink`.
///
/// Fatal: pairing failures and a batch that still fails after the retries.
/// Everything else is logged per document and the run moves on.
pub async fn run_import(
    options: &ImportOptions,
    sink: &dyn DocumentSink,
    cancel: &CancelFlag,
) -> Result<ImportReport> {
    import_documents(options, sink, cancel, &mut |_: u64| {}).await
}

/// `handled` runs after each document, whatever its outcome.
async fn import_documents(
    options: &ImportOptions,
    sink: &dyn DocumentSink,
    cancel: &CancelFlag,
    handled: &mut (dyn FnMut(u64) + Send),
) -> Result<ImportReport> {
    let base_dir = options.base_dir.clone();
    let pairing = tokio::task::spawn_blocking(move || scan_documents(&base_dir))
        .await
        .map_err(|e| Error::Join(format!("scan join failed: {e}")))??;
    let pairing = Arc::new(pairing);

    let mut ids = pairing.eligible_ids();
    let mut report = ImportReport {
        text_files: pairing.text.len(),
        html_files: pairing.html.len(),
        eligible: ids.len(),
        ..ImportReport::default()
    };
    if options.max_count > 0 {
        ids.truncate(options.max_count);
    }
    report.selected = ids.len();
    tracing::info!(
        eligible = report.eligible,
        selected = report.selected,
        "importing documents from {}",
        options.base_dir.display()
    );

    sink.delete_all().await?;

    let languages = Arc::new(LanguageContext::new());
    let mut filter = WarningFilter::new(options.ignore.clone());
    let mut batcher = Batcher {
        sink,
        retries: options.flush_retries,
        pending: Vec::new(),
    };
    let max_length = options.max_length;

    let mut conversions = stream::iter(ids)
        .map(|id| {
            let pairing = Arc::clone(&pairing);
            let languages = Arc::clone(&languages);
            let handle = tokio::task::spawn_blocking(move || -> Result<Conversion> {
                let (text_path, html_path) = pairing
                    .paths(id)
                    .ok_or_else(|| Error::Read(format!("document {id} is not paired")))?;
                convert_document(id, text_path, html_path, max_length, &languages)
            });
            async move { (id, handle.await) }
        })
        .buffered(options.jobs.max(1));

    while let Some((id, joined)) = conversions.next().await {
        if cancel.is_cancelled() {
            report.cancelled = true;
            tracing::warn!("import cancelled before document {id}");
            break;
        }
        match joined {
            Ok(Ok(converted)) => {
                for w in &converted.warnings {
                    filter.emit(w);
                }
                match converted.outcome {
                    Outcome::Record(record) => batcher.push(record, &mut report).await?,
                    Outcome::TooLong(_) => report.skipped_too_long += 1,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(id, "Warning: {e}");
                report.failed += 1;
                report.failed_ids.push(id);
            }
            Err(e) => {
                tracing::warn!(id, "Warning: conversion of document {id} aborted: {e}");
                report.failed += 1;
                report.failed_ids.push(id);
            }
        }
        handled(id);
    }
    drop(conversions);

    batcher.flush(&mut report).await?;

    report.warnings = filter.counts().clone();
    report.unmapped_languages = languages.unmapped_languages();
    tracing::info!(
        imported = report.imported,
        skipped_too_long = report.skipped_too_long,
        failed = report.failed,
        cancelled = report.cancelled,
        "import finished"
    );
    Ok(report)
}
