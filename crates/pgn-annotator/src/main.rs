//! PGN annotator
//!
//! Reads one game, has a UCI engine judge every move, and prints the game
//! back as PGN with comments, engine lines and quality glyphs.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use pgn_annotator::analyzer;
use pgn_annotator::chess_core::{read_game_file, render_game};
use pgn_annotator::config::AnnotatorConfig;
use pgn_annotator::error::AnnotateError;
use pgn_annotator::stockfish::StockfishEngine;

#[derive(Parser, Debug)]
#[command(name = "pgn-annotator", about = "Annotate a chess game with engine analysis")]
struct Args {
    /// Input PGN file (the first game is annotated)
    #[arg(short, long)]
    file: PathBuf,

    /// Search depth in plies
    #[arg(short, long)]
    depth: Option<u32>,

    /// Path to the UCI engine binary
    #[arg(long)]
    engine: Option<String>,

    /// Write a JSON report of every judged move to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr, stdout carries only the PGN
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    if !args.file.is_file() {
        error!(file = %args.file.display(), "Input file does not exist");
        return Err(AnnotateError::Input(format!(
            "file '{}' does not exist",
            args.file.display()
        ))
        .into());
    }

    let mut config = AnnotatorConfig::load()?;
    if let Some(depth) = args.depth {
        config = config.with_depth(depth)?;
    }
    if let Some(engine) = args.engine {
        config.stockfish_path = engine;
    }
    if args.report.is_some() {
        config.report_path = args.report;
    }

    let mut game = read_game_file(&args.file)
        .map_err(|e| AnnotateError::Input(format!("{}: {e}", args.file.display())))?;
    info!(file = %args.file.display(), "Game loaded");

    let mut engine = StockfishEngine::new(&config).await?;
    let outcome = analyzer::annotate_game(&mut engine, &mut game, config.search_depth).await;
    engine.quit().await;
    let reports = outcome?;

    if let Some(path) = &config.report_path {
        std::fs::write(path, serde_json::to_string_pretty(&reports)?)?;
        info!(path = %path.display(), moves = reports.len(), "Move report written");
    }

    print!("{}", render_game(&game)?);
    Ok(())
}
