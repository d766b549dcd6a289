//! Annotator configuration from environment variables

use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::error::AnnotateError;

pub const DEFAULT_STOCKFISH_PATH: &str = "/usr/bin/stockfish";
pub const DEFAULT_SEARCH_DEPTH: u32 = 12;

#[derive(Clone, Debug)]
pub struct AnnotatorConfig {
    /// Path to the UCI engine binary
    pub stockfish_path: String,

    /// Search depth in plies; also bounds inserted variations to `depth / 2`
    pub search_depth: u32,

    /// Engine search threads
    pub engine_threads: u32,

    /// Engine hash table size in MB
    pub engine_hash_mb: u32,

    /// Optional JSON move report destination
    pub report_path: Option<PathBuf>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            stockfish_path: DEFAULT_STOCKFISH_PATH.to_string(),
            search_depth: DEFAULT_SEARCH_DEPTH,
            engine_threads: 1,
            engine_hash_mb: 256,
            report_path: None,
        }
    }
}

impl AnnotatorConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, AnnotateError> {
        let defaults = Self::default();

        let stockfish_path = env::var("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path);

        let search_depth = match env::var("SEARCH_DEPTH") {
            Ok(v) => parse_depth(&v)?,
            Err(_) => defaults.search_depth,
        };

        let engine_threads = env::var("ENGINE_THREADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.engine_threads);

        let engine_hash_mb = env::var("ENGINE_HASH_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.engine_hash_mb);

        let report_path = env::var("ANNOTATION_REPORT").ok().map(PathBuf::from);

        info!(
            stockfish_path = %stockfish_path,
            search_depth,
            engine_threads,
            engine_hash_mb,
            "Annotator config loaded"
        );

        Ok(Self {
            stockfish_path,
            search_depth,
            engine_threads,
            engine_hash_mb,
            report_path,
        })
    }

    /// Set the search depth, rejecting zero.
    pub fn with_depth(mut self, depth: u32) -> Result<Self, AnnotateError> {
        if depth == 0 {
            return Err(AnnotateError::Config(
                "search depth must be a positive integer".into(),
            ));
        }
        self.search_depth = depth;
        Ok(self)
    }
}

/// Parse a positive search depth.
pub fn parse_depth(value: &str) -> Result<u32, AnnotateError> {
    match value.trim().parse::<u32>() {
        Ok(depth) if depth > 0 => Ok(depth),
        _ => Err(AnnotateError::Config(format!(
            "search depth must be a positive integer, got '{value}'"
        ))),
    }
}
