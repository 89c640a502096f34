//! PDF Pacer Web - JSON API for paced reading of a directory of PDFs.

mod helpers;
mod library;
mod routes;
mod state;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pdf_pacer_core::{AppConfig, MemoryProgressStore, PdfPacer, ProgressStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use library::Library;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pdf-pacer-web")]
#[command(author, version, about = "PDF Pacer Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Directory of PDFs to serve
    #[arg(short, long, env = "PDF_PACER_LIBRARY", default_value = ".")]
    library: PathBuf,

    /// Config file path
    #[arg(short, long, env = "PDF_PACER_CONFIG")]
    config: Option<PathBuf>,

    /// Progress database directory
    #[arg(long, env = "PDF_PACER_PROGRESS_PATH")]
    progress_path: Option<PathBuf>,

    /// Session log file (JSON lines)
    #[arg(long, env = "PDF_PACER_SESSION_LOG")]
    session_log: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // sled is noisy below warn
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},sled=warn")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    if let Some(path) = args.progress_path {
        config.storage.progress_path = Some(path);
    }
    if let Some(path) = args.session_log {
        config.storage.session_log_path = Some(path);
    }

    if !args.library.is_dir() {
        bail!("Library {} is not a directory", args.library.display());
    }

    // Opens the progress database - fails fast if another process holds it
    let pacer = PdfPacer::new(config).context("Failed to open progress store")?;
    let progress = pacer.progress_store().cloned().unwrap_or_else(|| {
        warn!("Progress persistence disabled, positions are kept in memory");
        Arc::new(MemoryProgressStore::new()) as Arc<dyn ProgressStore>
    });

    let library = Library::new(&args.library);
    info!("Serving PDFs from {}", library.dir().display());

    let state = Arc::new(AppState::new(
        pacer.config().clone(),
        library,
        progress,
        Arc::clone(pacer.session_log()),
    ));

    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new()),
    );

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
