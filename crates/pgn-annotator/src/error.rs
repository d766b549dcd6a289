//! Annotator error types

use chess_core::{PgnError, TreeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error("Engine protocol error: {0}")]
    EngineProtocol(String),

    #[error("PGN error: {0}")]
    Pgn(#[from] PgnError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
