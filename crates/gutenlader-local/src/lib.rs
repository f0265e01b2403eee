//! Filesystem ingestion pipeline: pairing, decoding, marker scanning,
//! front-matter parsing, language normalization and batched import.

pub mod convert;
pub mod decode;
pub mod encoding;
pub mod import;
pub mod language;
pub mod metadata;
pub mod pair;
pub mod scan;
pub mod sink;

pub use import::{run_import, CancelFlag, ImportOptions, ImportReport};
pub use sink::{JsonlSink, MemorySink};
