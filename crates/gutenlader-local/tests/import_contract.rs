use gutenlader_core::{DocumentRecord, DocumentSink, Result, WarningCode};
use gutenlader_local::{run_import, CancelFlag, ImportOptions, MemorySink};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

fn latin1(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u32 as u8).collect()
}

fn write_book(root: &Path, id: u64, language: &str, body: &str) {
    let text = format!(
        "The Project Gutenberg eBook of Book {id}\r\n\r\nTitle: Book {id}\r\nAuthor: Writer {id}\r\n\
         Language: {language}\r\nCharacter set encoding: UTF-8\r\n\r\n\
         *** START OF THE PROJECT GUTENBERG EBOOK BOOK {id} ***\r\n{body}\r\n\
         *** END OF THE PROJECT GUTENBERG EBOOK BOOK {id} ***\r\nLicense text\r\n"
    );
    fs::write(root.join(format!("{id}-8.txt")), text).unwrap();
    fs::write(
        root.join(format!("{id}-h.htm")),
        format!("<html><body>{body}</body></html>"),
    )
    .unwrap();
}

#[tokio::test]
async fn french_latin1_document_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let nested = tmp.path().join("4/42");
    fs::create_dir_all(&nested).unwrap();
    let text = "Le Projet Gutenberg\n\
                Title: Les Misérables\n\
                Author: Victor Hugo <hugo@example.org>\n\
                Language: French\n\
                Character set encoding: ISO-8859-1\n\
                \n\
                *** START OF THIS PROJECT GUTENBERG EBOOK LES MISÉRABLES ***\n\
                \n\
                Tome premier-Fantine.\n\
                \n\
                Être ou ne pas être.\n\
                *** END OF THIS PROJECT GUTENBERG EBOOK LES MISÉRABLES ***\n\
                Fin.\n";
    fs::write(nested.join("42-8.txt"), latin1(text)).unwrap();
    let html = "<html><head><title>Les Misérables</title></head><body><p>Tome premier</p></body></html>";
    fs::write(nested.join("42-h.htm"), latin1(html)).unwrap();

    let sink = MemorySink::new();
    let report = run_import(&ImportOptions::new(tmp.path()), &sink, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.id, 42);
    assert_eq!(r.language_code, "fr");
    assert_eq!(r.search_config(), "french");
    assert_eq!(r.title, "Les Misérables");
    assert_eq!(r.authors, "Victor Hugo");
    assert_eq!(r.text, "Tome premier-Fantine.\n\nÊtre ou ne pas être.");
    assert_eq!(r.html, html);
}

#[tokio::test]
async fn max_count_keeps_the_lowest_ids() {
    let tmp = tempfile::tempdir().unwrap();
    for id in 1..=250u64 {
        write_book(tmp.path(), 1000 - id, "English", "text");
    }
    let sink = MemorySink::new();
    let mut options = ImportOptions::new(tmp.path());
    options.max_count = 100;

    let report = run_import(&options, &sink, &CancelFlag::new()).await.unwrap();
    assert_eq!(report.eligible, 250);
    assert_eq!(report.selected, 100);
    assert_eq!(report.imported, 100);
    let ids: Vec<u64> = sink.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, (750..850u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn oversized_document_is_skipped_and_the_run_continues() {
    let tmp = tempfile::tempdir().unwrap();
    write_book(tmp.path(), 1, "English", "short");
    write_book(tmp.path(), 2, "English", &"long ".repeat(200));
    write_book(tmp.path(), 3, "English", "short");
    let sink = MemorySink::new();
    let mut options = ImportOptions::new(tmp.path());
    options.max_length = 600;

    let report = run_import(&options, &sink, &CancelFlag::new()).await.unwrap();
    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped_too_long, 1);
    assert_eq!(report.warnings[&WarningCode::FileTooLarge].suppressed, 1);
    let ids: Vec<u64> = sink.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl DocumentSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn delete_all(&self) -> Result<()> {
        self.events.lock().unwrap().push("delete_all".into());
        Ok(())
    }

    async fn bulk_insert(&self, records: Vec<DocumentRecord>) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("insert:{}", records.len()));
        Ok(())
    }
}

#[tokio::test]
async fn delete_all_runs_once_before_any_insert() {
    let tmp = tempfile::tempdir().unwrap();
    for id in 1..=120u64 {
        write_book(tmp.path(), id, "German", "Text");
    }
    let sink = RecordingSink::default();
    let report = run_import(&ImportOptions::new(tmp.path()), &sink, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(report.imported, 100);
    assert_eq!(
        *sink.events.lock().unwrap(),
        vec!["delete_all".to_string(), "insert:100".to_string()]
    );
}

#[tokio::test]
async fn unpaired_files_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    write_book(tmp.path(), 1, "English", "a");
    fs::write(tmp.path().join("2-8.txt"), "only text").unwrap();
    fs::write(tmp.path().join("3-h.htm"), "only html").unwrap();
    fs::write(tmp.path().join("notes.txt"), "noise").unwrap();

    let sink = MemorySink::new();
    let report = run_import(&ImportOptions::new(tmp.path()), &sink, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(report.text_files, 2);
    assert_eq!(report.html_files, 2);
    assert_eq!(report.eligible, 1);
    assert_eq!(report.imported, 1);
}

#[tokio::test]
async fn unknown_language_is_counted_once_and_listed() {
    let tmp = tempfile::tempdir().unwrap();
    for id in 1..=3u64 {
        write_book(tmp.path(), id, "Klingon", "Qapla'");
    }
    write_book(tmp.path(), 4, "Quiche", "text");
    write_book(tmp.path(), 5, "Quiche", "text");

    let sink = MemorySink::new();
    let report = run_import(&ImportOptions::new(tmp.path()), &sink, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(report.imported, 5);
    assert!(sink.records().iter().all(|r| r.language_code == "??"));
    assert_eq!(report.warnings[&WarningCode::UnknownLanguage].emitted, 1);
    assert_eq!(report.warnings[&WarningCode::NoIsoLanguage].suppressed, 1);
    assert_eq!(report.unmapped_languages, vec!["Klingon".to_string()]);
}

#[cfg(unix)]
#[tokio::test]
async fn dangling_file_fails_that_document_only() {
    let tmp = tempfile::tempdir().unwrap();
    write_book(tmp.path(), 1, "English", "a");
    write_book(tmp.path(), 3, "English", "c");
    fs::write(tmp.path().join("2-8.txt"), "Title: Two").unwrap();
    std::os::unix::fs::symlink(tmp.path().join("gone.htm"), tmp.path().join("2-h.htm")).unwrap();

    let sink = MemorySink::new();
    let report = run_import(&ImportOptions::new(tmp.path()), &sink, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(report.imported, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_ids, vec![2]);
}

#[tokio::test]
async fn missing_base_dir_is_fatal_and_leaves_the_sink_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let sink = MemorySink::new();
    let err = run_import(
        &ImportOptions::new(tmp.path().join("nope")),
        &sink,
        &CancelFlag::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, gutenlader_core::Error::Scan(_)));
    assert_eq!(sink.delete_all_calls(), 0);
}
