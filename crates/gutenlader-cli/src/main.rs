use anyhow::Result;
use clap::{Parser, Subcommand};
use gutenlader::WarningCode;
use gutenlader_local::import::{DEFAULT_FLUSH_RETRIES, DEFAULT_MAX_COUNT, DEFAULT_MAX_LENGTH};
use gutenlader_local::pair::scan_documents;
use gutenlader_local::{run_import, CancelFlag, ImportOptions, JsonlSink};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Number of documents the `demo` subcommand imports.
const DEMO_MAX_COUNT: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "gutenlader")]
#[command(about = "Import a local Project Gutenberg mirror into normalized document records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace the stored corpus with documents from the base directory (json report).
    Import(ImportCmd),
    /// Import a small sample (10 documents) for a quick local setup.
    Demo(DemoCmd),
    /// Check the base directory and output location (json).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// Directory searched recursively for `{id}-8.txt` / `{id}-h.htm` pairs.
    #[arg(long, short = 'b', env = "GUTENLADER_BASE_DIR", default_value = "gutenberg")]
    base_dir: PathBuf,
    /// Comma separated warning codes to suppress.
    ///
    /// Defaults to W100,W101,W200,W201,W300,W301,W400. Pass an empty string to see every warning.
    #[arg(long, short = 'i', env = "GUTENLADER_IGNORE")]
    ignore: Option<String>,
    /// JSON-lines file the records are written to (replaced on every run).
    #[arg(
        long,
        short = 'o',
        env = "GUTENLADER_OUT",
        default_value = "gutenberg-documents.jsonl"
    )]
    out: PathBuf,
    /// Documents converted concurrently. Output order does not depend on it.
    #[arg(long, short = 'j', env = "GUTENLADER_JOBS", default_value_t = 1)]
    jobs: usize,
    /// Extra attempts for a failed batch write before the run aborts.
    #[arg(long, env = "GUTENLADER_FLUSH_RETRIES", default_value_t = DEFAULT_FLUSH_RETRIES)]
    flush_retries: usize,
}

#[derive(clap::Args, Debug)]
struct ImportCmd {
    #[command(flatten)]
    source: SourceArgs,
    /// Maximum number of documents to import (lowest ids first; 0 = no limit).
    #[arg(long, short = 'c', env = "GUTENLADER_MAX_COUNT", default_value_t = DEFAULT_MAX_COUNT)]
    max_count: usize,
    /// Skip documents whose text is longer than this many characters (0 = no limit).
    #[arg(long, short = 'l', env = "GUTENLADER_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,
}

#[derive(clap::Args, Debug)]
struct DemoCmd {
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    #[arg(long, short = 'b', env = "GUTENLADER_BASE_DIR", default_value = "gutenberg")]
    base_dir: PathBuf,
    #[arg(
        long,
        short = 'o',
        env = "GUTENLADER_OUT",
        default_value = "gutenberg-documents.jsonl"
    )]
    out: PathBuf,
    /// Output format: json (default) or text.
    #[arg(long, default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json (default) or text.
    #[arg(long, default_value = "json")]
    output: String,
}

fn load_env_file() {
    // Opt-in only; never overrides variables already set in the process.
    let Ok(p) = std::env::var("GUTENLADER_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn init_tracing() {
    // Logs go to stderr; stdout is reserved for the JSON payload.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn import_options(source: &SourceArgs, max_count: usize, max_length: usize) -> Result<ImportOptions> {
    let mut options = ImportOptions::new(&source.base_dir);
    options.max_count = max_count;
    options.max_length = max_length;
    options.jobs = source.jobs.max(1);
    options.flush_retries = source.flush_retries;
    if let Some(list) = &source.ignore {
        options.ignore = WarningCode::parse_list(list)?;
    }
    Ok(options)
}

async fn run(kind: &str, options: ImportOptions, out: &Path) -> Result<()> {
    let sink = JsonlSink::new(out);
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; finishing the current document");
                cancel.cancel();
            }
        });
    }

    match run_import(&options, &sink, &cancel).await {
        Ok(report) => {
            let payload = serde_json::json!({
                "schema_version": 1,
                "kind": kind,
                "ok": true,
                "base_dir": options.base_dir.display().to_string(),
                "out": out.display().to_string(),
                "ignore": WarningCode::join_list(&options.ignore),
                "report": report,
            });
            println!("{payload}");
            Ok(())
        }
        Err(e) => {
            let payload = serde_json::json!({
                "schema_version": 1,
                "kind": kind,
                "ok": false,
                "error": { "code": e.code(), "message": e.to_string() },
            });
            println!("{payload}");
            Err(e.into())
        }
    }
}

fn doctor(args: &DoctorCmd) -> serde_json::Value {
    let mut checks: Vec<serde_json::Value> = Vec::new();

    let (scan_ok, scan_message, counts) = match scan_documents(&args.base_dir) {
        Ok(p) => (
            true,
            "base directory readable".to_string(),
            serde_json::json!({
                "text_files": p.text.len(),
                "html_files": p.html.len(),
                "pairs": p.eligible_ids().len(),
            }),
        ),
        Err(e) => (false, e.to_string(), serde_json::Value::Null),
    };
    checks.push(serde_json::json!({
        "name": "base_dir",
        "ok": scan_ok,
        "message": scan_message,
        "counts": counts,
    }));

    let out_dir = match args.out.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let out_ok = (|| -> anyhow::Result<()> {
        std::fs::create_dir_all(&out_dir)?;
        let probe = out_dir.join(format!("gutenlader-doctor-{}.probe", std::process::id()));
        std::fs::write(&probe, b"ok")?;
        let _ = std::fs::remove_file(&probe);
        Ok(())
    })();
    checks.push(serde_json::json!({
        "name": "out_dir_writable",
        "ok": out_ok.is_ok(),
        "message": match &out_ok {
            Ok(()) => "output directory writable".to_string(),
            Err(e) => e.to_string(),
        },
    }));

    let ok = checks.iter().all(|c| c["ok"].as_bool().unwrap_or(false));
    serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": ok,
        "name": "gutenlader",
        "version": env!("CARGO_PKG_VERSION"),
        "base_dir": args.base_dir.display().to_string(),
        "out": args.out.display().to_string(),
        "checks": checks,
    })
}

fn main() -> Result<()> {
    // The env file is applied while the process is still single-threaded.
    load_env_file();
    let cli = Cli::parse();
    init_tracing();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import(args) => {
            let options = import_options(&args.source, args.max_count, args.max_length)?;
            run("import", options, &args.source.out).await?;
        }
        Commands::Demo(args) => {
            let options = import_options(&args.source, DEMO_MAX_COUNT, DEFAULT_MAX_LENGTH)?;
            run("demo", options, &args.source.out).await?;
        }
        Commands::Doctor(args) => {
            let payload = doctor(&args);
            match args.output.to_ascii_lowercase().as_str() {
                "text" => {
                    println!(
                        "gutenlader {} (ok={})",
                        env!("CARGO_PKG_VERSION"),
                        payload["ok"].as_bool().unwrap_or(false)
                    );
                    println!("base_dir: {}", args.base_dir.display());
                    let checks = payload["checks"].as_array().cloned().unwrap_or_default();
                    let passed = checks
                        .iter()
                        .filter(|c| c["ok"].as_bool().unwrap_or(false))
                        .count();
                    println!("checks: {passed}/{} ok", checks.len());
                }
                _ => println!("{payload}"),
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "gutenlader",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("gutenlader {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}
