use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use docdigest_lib::config::{AppConfig, SummaryMode, APP_NAME, APP_VERSION};
use docdigest_lib::core_state::CoreState;
use docdigest_lib::pipeline::scan::{spawn_scan_job, ScanEvent, ScanTarget};

#[derive(Parser)]
#[command(name = "docdigest", version)]
#[command(about = "Summarize PDF, Word and Excel documents and aggregate the results")]
struct Cli {
    /// Directory holding the combined document and session state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Root directory for uploaded and scanned files
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Summarizer: key_sentence or frequency
    #[arg(long, global = true, value_parser = parse_mode)]
    mode: Option<SummaryMode>,

    /// Remote extraction backend (parse in process when unset)
    #[arg(long, global = true)]
    extractor_url: Option<String>,

    /// Log filter, e.g. "docdigest=debug" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Scan files under the upload root and merge them into the combined document
    Scan {
        /// Paths relative to the upload root
        #[arg(required = true)]
        paths: Vec<String>,
        /// Print the result cards as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the combined document
    Show {
        /// Only this entry
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Clear the combined document and the scan session
    Clear,
}

fn parse_mode(s: &str) -> Result<SummaryMode, String> {
    SummaryMode::from_str(s).ok_or_else(|| format!("unknown mode '{s}' (key_sentence, frequency)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    docdigest_lib::init_tracing(cli.log.as_deref());

    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.upload_dir = dir.join("uploads");
        config.data_dir = dir;
    }
    if let Some(dir) = cli.upload_dir {
        config.upload_dir = dir;
    }
    if let Some(mode) = cli.mode {
        config.summary_mode = mode;
    }
    if let Some(url) = cli.extractor_url {
        config.extractor_url = Some(url);
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(addr) = bind {
                config.bind_addr = addr;
            }
            serve(config).await
        }
        Commands::Scan { paths, json } => scan(config, paths, json).await,
        Commands::Show { key } => show(config, key),
        Commands::Clear => clear(config),
    }
}

fn open_core(config: AppConfig) -> Result<Arc<CoreState>> {
    let core = CoreState::open(config).context("Failed to open DocDigest state")?;
    Ok(Arc::new(core))
}

async fn serve(config: AppConfig) -> Result<()> {
    tracing::info!("{APP_NAME} starting v{APP_VERSION}");
    let addr = config.bind_addr;
    let core = open_core(config)?;
    docdigest_lib::api::serve(core, addr)
        .await
        .with_context(|| format!("API server on {addr} failed"))
}

async fn scan(config: AppConfig, paths: Vec<String>, json: bool) -> Result<()> {
    let grace = Duration::from_millis(config.progress_grace_ms);
    let core = open_core(config)?;
    let orchestrator = core.orchestrator().clone();

    let targets = paths
        .iter()
        .map(|p| ScanTarget::parse(p).with_context(|| format!("Cannot scan '{p}'")))
        .collect::<Result<Vec<_>>>()?;

    let mut job = spawn_scan_job(orchestrator, targets, grace);
    let cancel = job.cancel_token().clone();
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = job.events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                eprintln!("Stopping after the current file...");
                cancel.cancel();
                interrupted = true;
            }
        }
    }

    let report = job.handle.await.context("Scan worker failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.cards())?);
    }
    if report.summary.failed > 0 {
        bail!("{} of {} file(s) failed", report.summary.failed, report.summary.total);
    }
    Ok(())
}

fn print_event(event: &ScanEvent) {
    match event {
        ScanEvent::Started { total } => eprintln!("Scanning {total} file(s)"),
        ScanEvent::Progress { completed, total, current_path } => {
            eprintln!("[{completed}/{total}] {current_path}")
        }
        ScanEvent::FileProcessed { path, key, .. } => eprintln!("  ok      {path} -> {key}"),
        ScanEvent::FileFailed { path, error } => eprintln!("  failed  {path}: {error}"),
        ScanEvent::Completed { processed, failed, duration_ms } => {
            eprintln!("Done: {processed} processed, {failed} failed in {duration_ms} ms")
        }
        ScanEvent::Cancelled { completed, total } => {
            eprintln!("Cancelled after {completed} of {total} file(s)")
        }
        ScanEvent::Cleared => {}
    }
}

fn show(config: AppConfig, key: Option<String>) -> Result<()> {
    let core = open_core(config)?;
    let value = match key {
        Some(key) => core
            .store()
            .get(&key)
            .with_context(|| format!("No entry '{key}' in the combined document"))?,
        None => core.store().serialize(),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn clear(config: AppConfig) -> Result<()> {
    let core = open_core(config)?;
    core.orchestrator()
        .clear_all()
        .context("Failed to clear the combined document")?;
    eprintln!("Combined document cleared");
    Ok(())
}
