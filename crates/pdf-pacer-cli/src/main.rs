//! PDF Pacer CLI - paced reading of PDF documents from the terminal.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdf_pacer_core::{AppConfig, RevealPolicy, ZoomLevel};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pdf-pace")]
#[command(author, version, about = "Paced reading of PDF documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reader whose progress is loaded and saved
    #[arg(short, long, global = true, env = "PDF_PACER_USER", default_value = "local")]
    user: String,

    /// Progress database directory
    #[arg(long, global = true, env = "PDF_PACER_PROGRESS_PATH")]
    progress_path: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the word boxes of one page
    Words(WordsArgs),
    /// Print the table of contents
    Toc(TocArgs),
    /// Run a paced reading session
    Read(ReadArgs),
    /// Render a page with the reading shadow after some seconds of play
    Snapshot(SnapshotArgs),
    /// Inspect or clear saved reading progress
    #[command(subcommand)]
    Progress(ProgressCommand),
}

#[derive(Args, Debug)]
struct WordsArgs {
    /// Input PDF file
    pdf: PathBuf,

    /// Page number, 1-based
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Zoom level (75, 100, 125 or 150)
    #[arg(short, long, value_parser = parse_zoom)]
    zoom: Option<ZoomLevel>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Print the words as text lines in reading order
    #[arg(long, conflicts_with = "json")]
    text: bool,
}

#[derive(Args, Debug)]
struct TocArgs {
    /// Input PDF file
    pdf: PathBuf,

    /// Print JSON instead of a list
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ReadArgs {
    /// Input PDF file
    pdf: PathBuf,

    /// Reading speed in words per minute (default: saved or configured speed)
    #[arg(short, long)]
    wpm: Option<u32>,

    /// Zoom level (75, 100, 125 or 150)
    #[arg(short, long, value_parser = parse_zoom)]
    zoom: Option<ZoomLevel>,

    /// Simulated frames per second
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Stop after this many seconds of session time and keep the position
    #[arg(long)]
    max_seconds: Option<u64>,

    /// Step whole words instead of sweeping
    #[arg(long)]
    discrete: bool,

    /// Pace frames against the wall clock instead of simulating
    #[arg(long)]
    realtime: bool,

    /// Start from the beginning, ignoring saved progress
    #[arg(long)]
    restart: bool,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// Input PDF file
    pdf: PathBuf,

    /// Page number, 1-based
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Seconds of reading before the snapshot
    #[arg(short, long, default_value_t = 5.0)]
    seconds: f32,

    /// Reading speed in words per minute
    #[arg(short, long)]
    wpm: Option<u32>,

    /// Zoom level (75, 100, 125 or 150)
    #[arg(short, long, value_parser = parse_zoom)]
    zoom: Option<ZoomLevel>,

    /// Output PNG file
    #[arg(short, long)]
    out: PathBuf,
}

#[derive(Subcommand, Debug)]
enum ProgressCommand {
    /// List saved positions
    Show {
        /// List every reader, not just --user
        #[arg(long)]
        all: bool,
    },
    /// Forget the saved position in one document
    Reset {
        /// Document id (the PDF's file stem) or path
        document: PathBuf,
    },
}

fn parse_zoom(value: &str) -> Result<ZoomLevel, String> {
    ZoomLevel::parse(value).ok_or_else(|| format!("unsupported zoom '{value}', use 75, 100, 125 or 150"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = if let Some(config_path) = &cli.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    if let Some(path) = &cli.progress_path {
        config.storage.progress_path = Some(path.clone());
    }

    match cli.command {
        Command::Words(args) => commands::words(&config, &args),
        Command::Toc(args) => commands::toc(&config, &args),
        Command::Read(args) => {
            if args.discrete {
                config.reader.reveal_policy = RevealPolicy::Discrete;
            }
            commands::read(config, &cli.user, &args).await
        }
        Command::Snapshot(args) => commands::snapshot(&config, &args),
        Command::Progress(ProgressCommand::Show { all }) => {
            commands::progress_show(&config, (!all).then_some(cli.user.as_str()))
        }
        Command::Progress(ProgressCommand::Reset { document }) => {
            commands::progress_reset(&config, &cli.user, &document)
        }
    }
}
