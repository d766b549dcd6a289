pub use chess_core;

pub mod analysis;
pub mod analyzer;
pub mod annotate;
pub mod config;
pub mod error;
pub mod judge;
pub mod score;
pub mod stockfish;
